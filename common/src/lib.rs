pub mod auth;
pub mod event;
pub mod maintenance;
pub mod organiser;
pub mod rent;
pub mod tenant;
pub mod validation;

pub use auth::*;
pub use event::*;
pub use maintenance::*;
pub use organiser::*;
pub use rent::*;
use serde_json::{json, Value};
pub use tenant::*;
pub use validation::*;

/// JSON shape handed to clients, which may differ from the stored shape
/// (keys held outside the document are folded back in, for one).
pub trait Display {
    fn display(&self) -> Value;
}

impl<T: Display> Display for Vec<T> {
    fn display(&self) -> Value {
        let ret: Vec<Value> = self.iter().map(|item| item.display()).collect();
        json!(ret)
    }
}

impl<T: Display> Display for &T {
    fn display(&self) -> Value {
        (*self).display()
    }
}
