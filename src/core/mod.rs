// Domain-layer modules and shared errors/models
pub mod automation {
    pub use crate::automation::*;
}

pub mod errors {
    pub use crate::errors::*;
}

pub mod evaluator {
    pub use crate::evaluator::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod scoring {
    pub use crate::scoring::*;
}
