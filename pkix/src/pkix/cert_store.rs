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

//! Decoded certificate and CRL material available while building a path.

use log::{log_enabled, trace, warn, Level};
use x509_parser::{certificate::X509Certificate, revocation_list::CertificateRevocationList};

use super::{PkixValidationInformation, PkixValidationOptions};
use crate::{
    x500::{DistinguishedName, X500DnHandler},
    x509_support::{parse_certificate, parse_crl},
    Result, X509Credential,
};

/// A decoded certificate with its names in comparable form.
pub(crate) struct PathCertificate<'a> {
    pub(crate) der: &'a [u8],
    pub(crate) cert: X509Certificate<'a>,
    pub(crate) subject: DistinguishedName,
    pub(crate) issuer: DistinguishedName,
}

impl<'a> PathCertificate<'a> {
    pub(crate) fn parse(der: &'a [u8]) -> Result<Self> {
        let cert = parse_certificate(der)?;
        let subject = DistinguishedName::from_x509_name(cert.subject());
        let issuer = DistinguishedName::from_x509_name(cert.issuer());

        Ok(Self {
            der,
            cert,
            subject,
            issuer,
        })
    }

    /// A certificate is self-issued when its subject and issuer are equal.
    pub(crate) fn is_self_issued(&self) -> bool {
        self.subject == self.issuer
    }
}

/// A decoded CRL admitted to the store.
pub(crate) struct StoredCrl<'a> {
    pub(crate) crl: CertificateRevocationList<'a>,
    pub(crate) issuer: DistinguishedName,
}

/// The untrusted certificates and CRLs available to the path builder.
pub(crate) struct CertStore<'a> {
    pub(crate) certificates: Vec<PathCertificate<'a>>,
    pub(crate) crls: Vec<StoredCrl<'a>>,
}

impl<'a> CertStore<'a> {
    /// Assemble the store from the credential's chain, the CRLs in the
    /// validation information and, if enabled, the credential's own CRLs.
    pub(crate) fn build(
        info: &'a PkixValidationInformation,
        credential: &'a X509Credential,
        options: &PkixValidationOptions,
        handler: &dyn X500DnHandler,
        now: i64,
    ) -> Result<Self> {
        trace!("creating cert store to use during path validation");

        trace!("adding entity certificate chain to cert store");
        let certificates = credential
            .entity_certificate_chain()
            .iter()
            .map(|der| PathCertificate::parse(der))
            .collect::<Result<Vec<_>>>()?;

        if log_enabled!(Level::Trace) {
            for cert in &certificates {
                trace!(
                    "added certificate from entity cert chain to cert store with subject name '{}' issued by '{}' with serial number '{}'",
                    handler.name(&cert.subject),
                    handler.name(&cert.issuer),
                    cert.cert.raw_serial_as_string()
                );
            }
        }

        let mut crls = vec![];

        if !info.crls().is_empty() {
            trace!("processing CRLs from PKIX validation information");
            add_crls(&mut crls, info.crls(), options, handler, now)?;
        }

        if !credential.crls().is_empty() && options.process_credential_crls() {
            trace!("processing CRLs from untrusted credential");
            add_crls(&mut crls, credential.crls(), options, handler, now)?;
        }

        Ok(Self { certificates, crls })
    }

    pub(crate) fn contains_crls(&self) -> bool {
        !self.crls.is_empty()
    }
}

fn add_crls<'a>(
    store: &mut Vec<StoredCrl<'a>>,
    ders: &'a [Vec<u8>],
    options: &PkixValidationOptions,
    handler: &dyn X500DnHandler,
    now: i64,
) -> Result<()> {
    for der in ders {
        let crl = parse_crl(der)?;
        let issuer = DistinguishedName::from_x509_name(crl.issuer());
        let issuer_name = handler.name(&issuer);
        let this_update = crl.last_update().to_datetime();

        let is_empty = crl.iter_revoked_certificates().next().is_none();
        if is_empty && !options.process_empty_crls() {
            trace!("empty CRL not added to cert store, from issuer {issuer_name} dated {this_update}");
            continue;
        }

        let next_update = crl.next_update();
        let is_expired = next_update.is_some_and(|t| t.timestamp() < now);
        if is_expired && !options.process_expired_crls() {
            trace!("expired CRL not added to cert store, from issuer {issuer_name} dated {this_update}");
            continue;
        }

        trace!("added CRL to cert store from issuer {issuer_name} dated {this_update}");
        if is_empty {
            trace!("CRL added to cert store from issuer {issuer_name} dated {this_update} was empty");
        }
        if let (true, Some(next_update)) = (is_expired, next_update) {
            warn!(
                "using CRL from issuer {issuer_name} with a nextUpdate in the past: {}",
                next_update.to_datetime()
            );
        }

        store.push(StoredCrl { crl, issuer });
    }

    Ok(())
}
