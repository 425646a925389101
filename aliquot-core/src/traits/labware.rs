//! Labware definition lookup

use aliquot_protocol::LabwareDefinition;

/// Source of labware definitions not added to the engine directly
///
/// Typically backed by the definitions bundled with the robot software.
pub trait LabwareProvider {
    /// Look up a definition by its identifying triple
    fn get_definition(
        &self,
        namespace: &str,
        load_name: &str,
        version: u32,
    ) -> Option<LabwareDefinition>;
}
