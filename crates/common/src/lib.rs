/**
 * Session and role types, plus the trait
 *  an authorization provider implements.
 */
pub mod auth;
/**
 * Admission checks run by the download
 *  route before a private file is streamed.
 */
pub mod gate;
/**
 * Minting and verifying protected
 *  download links.
 */
pub mod link;
/**
 * Relative path validation. Everything a
 *  caller hands us passes through here first.
 */
pub mod path;
/**
 * The `ff-private://` reference format.
 */
pub mod reference;
pub mod render;
/**
 * Rewriting upload references inside
 *  arbitrary submission payloads.
 */
pub mod rewrite;
/**
 * The private store: relocation into,
 *  and resolution out of, the private
 *  base directory.
 */
pub mod store;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::auth::{Authorizer, Role, Session};
    pub use crate::gate::{DownloadGate, DownloadRequest, GateError};
    pub use crate::link::{LinkError, LinkKey, LinkSigner, ProtectedLink, DOWNLOAD_ACTION};
    pub use crate::path::{sanitize, RelativePath, SanitizeError};
    pub use crate::reference::PrivateReference;
    pub use crate::render::{LinkRenderer, RenderError, Rendered};
    pub use crate::rewrite::{ReferenceRewriter, RewriteSummary, UploadLocator};
    pub use crate::store::{PrivateStore, ServableFile, StoreError, UploadTarget};
    pub use crate::version::build_info;
}
