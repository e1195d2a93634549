pub mod ddl;
pub mod deployments;
pub mod messages;
pub mod metadata;
pub mod model_outputs;
pub mod recordings;
