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

//! CRL-based revocation status checking.

use log::trace;
use x509_parser::error::X509Error;

use super::cert_store::{PathCertificate, StoredCrl};
use crate::{Error, Result};

const CRL_NUMBER_OID: &str = "2.5.29.20";
const AUTHORITY_KEY_IDENTIFIER_OID: &str = "2.5.29.35";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum RevocationStatus {
    Good,
    Revoked,

    /// No usable CRL from the certificate's issuer was available.
    Undetermined,
}

/// Determine the revocation status of `cert`, issued by `issuer`, from the
/// stored CRLs.
///
/// A CRL is usable only if it names the certificate's issuer, is current,
/// has no unsupported critical extensions, and carries a valid signature by
/// the issuer's key.
pub(crate) fn check_revocation(
    cert: &PathCertificate,
    issuer: &PathCertificate,
    crls: &[StoredCrl],
    now: i64,
) -> Result<RevocationStatus> {
    let mut status = RevocationStatus::Undetermined;

    if issuer
        .cert
        .key_usage()
        .ok()
        .flatten()
        .is_some_and(|ku| !ku.value.crl_sign())
    {
        trace!("issuer key usage does not permit CRL signing");
        return Ok(status);
    }

    for stored in crls {
        if stored.issuer != cert.issuer {
            continue;
        }

        let crl = &stored.crl;
        if crl.last_update().timestamp() > now {
            trace!("skipping CRL that is not yet valid");
            continue;
        }
        if crl.next_update().is_some_and(|t| t.timestamp() < now) {
            trace!("skipping CRL whose nextUpdate is in the past");
            continue;
        }

        if let Some(ext) = crl.extensions().iter().find(|ext| {
            let oid = ext.oid.to_id_string();
            ext.critical && oid != CRL_NUMBER_OID && oid != AUTHORITY_KEY_IDENTIFIER_OID
        }) {
            trace!("skipping CRL with unsupported critical extension {}", ext.oid);
            continue;
        }

        match crl.verify_signature(issuer.cert.public_key()) {
            Ok(()) => {}
            Err(X509Error::SignatureVerificationError | X509Error::SignatureUnsupportedAlgorithm) => {
                trace!("skipping CRL whose signature does not verify under the issuer's key");
                continue;
            }
            Err(e) => return Err(Error::CryptoLibraryError(e.to_string())),
        }

        let serial = cert.cert.raw_serial();
        if crl
            .iter_revoked_certificates()
            .any(|revoked| revoked.raw_serial() == serial)
        {
            return Ok(RevocationStatus::Revoked);
        }

        status = RevocationStatus::Good;
    }

    Ok(status)
}
