// Module layout (Clean Architecture style)
// - bootstrap: configuration and wiring
// - infrastructure: asset transport adapters (HTTP API, S3, local disk)
// - application: ports, reconciliation engine, document committer, use cases
// - domain: placeholder tags, assignments, image files

pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod infrastructure;
