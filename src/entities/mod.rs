// Entity Models
// A SWIFT code record is the only entity; its branch relation is computed on read.

pub mod swift_code;

pub use swift_code::{SwiftCode, SwiftCodeCandidate};
