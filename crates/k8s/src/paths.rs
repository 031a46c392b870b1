//! Slash separated paths of well-known manifest fields.

pub const NAME: &str = "name";
pub const KIND: &str = "kind";
pub const RESOURCES: &str = "resources";
pub const LIMITS: &str = "limits";
pub const REQUESTS: &str = "requests";
pub const CPU: &str = "cpu";
pub const MEMORY: &str = "memory";

pub const METADATA_NAME: &str = "metadata/name";

pub const POD_CONTAINERS: &str = "spec/containers";
pub const POD_INIT_CONTAINERS: &str = "spec/initContainers";

/// Containers of a workload template (Deployment, StatefulSet, Job, ...)
pub const TEMPLATE_CONTAINERS: &str = "spec/template/spec/containers";
pub const TEMPLATE_INIT_CONTAINERS: &str = "spec/template/spec/initContainers";

/// Only present on scalable workloads
pub const REPLICAS: &str = "spec/replicas";

pub const SERVICE_NAME: &str = "spec/serviceName";
pub const VOLUME_CLAIM_TEMPLATES: &str = "spec/volumeClaimTemplates";
pub const STORAGE_REQUEST: &str = "spec/resources/requests/storage";

pub const APPLICATION_PROPERTIES: &str = "data/application.properties";
