//! External collaborators: the trained classifier and the text-generation service.

pub mod classifier {
    pub use crate::classifier::*;
}

pub mod text_generation {
    pub use crate::circuit_breaker::*;
    pub use crate::text_generation::*;
}
