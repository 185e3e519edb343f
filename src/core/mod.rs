// Domain-layer modules and shared errors/models
pub mod network {
    pub use crate::network::*;
}

pub mod overlap {
    pub use crate::overlap::*;
}

pub mod pagination {
    pub use crate::pagination::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
