pub mod harvester;
pub mod orchestrator;
pub mod pagination;
