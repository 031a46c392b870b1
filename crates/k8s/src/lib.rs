//! Shared Kubernetes utilities.
//!
//! Everything here is pure: parsing resource quantities, normalizing container
//! resources and the well-known document paths used to find containers in
//! workload manifests. File and process handling lives in `kutils`.

pub mod paths;
pub mod quantity;
pub mod resources;

pub use quantity::{parse_quantity, resource_value, QuantityError, GIBS};
pub use resources::{ContainerResources, ResourceKind, ResourcePair, Totals};
