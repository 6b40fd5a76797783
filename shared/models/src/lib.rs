//! # Bomsheet Domain Models
//!
//! Record and payload types for the two sheets managed by the service.
//!
//! ## Key Models
//!
//! - **BomRecord**: a serial-numbered unit of a part and the assembly it belongs to
//! - **BomTreeNode**: one part in the derived assembly hierarchy
//! - **MeasurementRecord**: a named parameter value recorded against a serial number
//! - **ApiEnvelope**: the `{ success, message, timestamp, data }` response body
//!
//! Payload types (`NewBomRecord`, `NewMeasurement`, `MeasurementUpdate`) carry
//! `validator` rules that are checked before anything reaches storage.

pub mod bom;
pub mod envelope;
pub mod measurement;
pub mod receipt;
pub mod record_id;

pub use bom::*;
pub use envelope::*;
pub use measurement::*;
pub use receipt::*;
pub use record_id::RecordId;
