/// Failures that abort a hologram generation pass before any grid buffer is allocated.
///
/// Facet-level and point-level anomalies are never reported here, see
/// [`crate::facet::FacetRejection`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HologramError {
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}
