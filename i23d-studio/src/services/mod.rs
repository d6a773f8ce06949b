//! Services for i23d-studio

pub mod mesh_convert;
pub mod meshy_client;
pub mod poller;
pub mod progress;

pub use mesh_convert::{export, load_glb, ConvertError, ExportFormat, TriMesh};
pub use meshy_client::{MeshyClient, MeshyError, RemoteGeneration, TaskOutcome, TaskSnapshot};
pub use poller::{run_generation, PollTiming, PollerFsm};
