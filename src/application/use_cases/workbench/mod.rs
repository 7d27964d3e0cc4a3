pub mod publish_document;
