pub use evolvm_core::{Hardware, InstSet, IsolatedOrganism, Organism};
pub mod ancestor {
    pub use evolvm_core::ancestor::*;
}
pub mod config {
    pub use evolvm_core::config::*;
}
pub mod context {
    pub use evolvm_core::context::*;
}
pub mod cost {
    pub use evolvm_core::cost::*;
}
pub mod divide {
    pub use evolvm_core::divide::*;
}
pub mod hardware {
    pub use evolvm_core::hardware::*;
}
pub mod head {
    pub use evolvm_core::head::*;
}
pub mod label {
    pub use evolvm_core::label::*;
}
pub mod metrics {
    pub use evolvm_core::metrics::*;
}
pub mod mutation {
    pub use evolvm_core::mutation::*;
}
pub mod organism {
    pub use evolvm_core::organism::*;
}
pub mod registry {
    pub use evolvm_core::registry::*;
}
pub mod io {
    pub use evolvm_io::*;
}

pub mod lineage;

pub mod state {
    pub use evolvm_data::*;
}
