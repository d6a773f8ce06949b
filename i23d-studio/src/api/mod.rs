//! API endpoints for i23d-studio

mod generation;
mod health;
mod sse;
mod ui;

pub use generation::{
    convert_asset, generation_routes, get_generation_status, start_generation, ConvertRequest,
    GenerationStatusResponse, StartGenerationResponse,
};
pub use health::{health_routes, HealthResponse};
pub use sse::generation_event_stream;
pub use ui::ui_routes;
