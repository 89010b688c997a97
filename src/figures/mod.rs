//! Figure metadata for the research pages.

pub mod captions;
pub mod corpus;
pub mod registry;
pub mod topics;

pub use captions::{CrossrefClient, DEFAULT_CROSSREF_URL, run_figure_captions};
pub use registry::{Registry, load_registry, run_figure_registry};
pub use topics::{Topic, load_topics};
