// Copyright 2024 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

use thiserror::Error;

/// `Error` enumerates the security-processing errors that can be reported
/// while evaluating the trust of an X.509 credential.
///
/// A trust decision that simply comes out negative (the names don't match, no
/// certification path could be built) is never reported as an error. Those
/// cases are reported as `Ok(false)`.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The PKIX validation information did not contain any trust anchors.
    ///
    /// This is a configuration problem with the validation information
    /// rather than a statement about the credential.
    #[error("no trust anchors were found in the PKIX validation information")]
    NoTrustAnchors,

    /// A certificate could not be decoded.
    #[error("the certificate is invalid: {0}")]
    InvalidCertificate(String),

    /// A certificate revocation list could not be decoded.
    #[error("the CRL is invalid: {0}")]
    InvalidCrl(String),

    /// The validation information or trusted names could not be resolved.
    #[error("unable to resolve trust information: {0}")]
    ResolutionFailed(String),

    /// An error was reported by the underlying cryptography implementation.
    #[error("an error was reported by the cryptography library: {0}")]
    CryptoLibraryError(String),

    /// A configuration value was invalid.
    #[error("bad parameter: {0}")]
    BadParam(String),
}

impl Error {
    /// Returns `true` if this error only invalidates the PKIX validation
    /// information it was raised for.
    ///
    /// [`PkixX509CredentialTrustEngine`] logs such errors and moves on to the
    /// next set of validation information. All other errors abort the
    /// validation.
    ///
    /// [`PkixX509CredentialTrustEngine`]: crate::pkix::PkixX509CredentialTrustEngine
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoTrustAnchors | Self::InvalidCertificate(_) | Self::InvalidCrl(_)
        )
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::BadParam(err.to_string())
    }
}

/// A specialized `Result` type for trust evaluation operations.
pub type Result<T> = std::result::Result<T, Error>;
