use crate::error::{BomsheetError, BomsheetResult};
use validator::{Validate, ValidationErrors};

pub fn validate_model<T: Validate>(model: &T) -> BomsheetResult<()> {
    match model.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let field = errors
                .field_errors()
                .keys()
                .min()
                .map(|field| field.to_string())
                .unwrap_or_else(|| "data".to_string());
            Err(BomsheetError::validation(field, format_validation_errors(&errors)))
        }
    }
}

/// One message per failed rule, sorted by field name so output is stable.
pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);

    let mut messages = Vec::new();
    for (field, field_errors) in fields {
        for error in field_errors {
            let message = match (&error.message, &*error.code) {
                (Some(message), _) => message.to_string(),
                (None, "length") => format!("Length validation failed for field '{}'", field),
                (None, "required") => format!("Field '{}' is required", field),
                (None, code) => format!("Validation failed for field '{}': {}", field, code),
            };
            messages.push(message);
        }
    }

    messages.join(", ")
}

/// Parse a JSON value into a payload type and run its validation rules.
pub fn parse_payload<T>(value: serde_json::Value) -> BomsheetResult<T>
where
    T: serde::de::DeserializeOwned + Validate,
{
    let payload: T = serde_json::from_value(value)
        .map_err(|err| BomsheetError::validation("data", format!("Invalid data: {}", err)))?;
    validate_model(&payload)?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bomsheet_models::{NewBomRecord, NewMeasurement};
    use serde_json::json;

    #[test]
    fn test_validate_model_reports_custom_message() {
        let err = validate_model(&NewBomRecord::new("", "SN-1")).unwrap_err();
        match err {
            BomsheetError::Validation { field, message } => {
                assert_eq!(field, "part_no");
                assert!(message.contains("Part number"), "{}", message);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_parse_payload_rejects_non_scalar_value() {
        let result = parse_payload::<NewMeasurement>(json!({
            "serial_number": "SN-1",
            "para_name": "Voltage",
            "para_value": [1, 2]
        }));
        assert!(matches!(result, Err(BomsheetError::Validation { .. })));
    }

    #[test]
    fn test_parse_payload_accepts_valid_measurement() {
        let measurement: NewMeasurement = parse_payload(json!({
            "serial_number": "SN-1",
            "para_name": "Voltage",
            "para_value": 3.3
        }))
        .unwrap();
        assert_eq!(measurement.para_value.to_cell(), "3.3");
    }
}
