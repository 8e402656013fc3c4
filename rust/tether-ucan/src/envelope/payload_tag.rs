/// The wire tag a payload type carries inside its envelope.
///
/// The tag keys the payload map entry next to the `"h"` varsig header,
/// e.g. `ucan/dlg@1.0.0-rc.1` for delegations.
pub trait PayloadTag {
    /// The token kind, e.g. `dlg` or `inv`.
    fn spec_id() -> &'static str;

    /// The payload schema version.
    fn version() -> &'static str;

    /// The full map key: `ucan/<spec_id>@<version>`.
    #[must_use]
    fn tag() -> String {
        format!("ucan/{}@{}", Self::spec_id(), Self::version())
    }
}
