pub mod pipeline_api;
