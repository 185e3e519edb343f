//! External service integrations.

pub mod companies_house {
    pub use crate::companies_house::*;
}

pub mod opencorporates {
    pub use crate::opencorporates::*;
}

pub mod aleph {
    pub use crate::aleph::*;
}

pub mod wayback {
    pub use crate::wayback::*;
}

pub mod subdomains {
    pub use crate::subdomains::*;
}

pub mod fallback {
    pub use crate::fallback::*;
}
