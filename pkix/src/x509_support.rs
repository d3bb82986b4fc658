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

//! Helpers for extracting identifiers from X.509 certificates and for
//! decoding certificate and CRL material.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use x509_parser::{
    certificate::X509Certificate, extensions::GeneralName, pem::Pem,
    revocation_list::CertificateRevocationList,
};

use crate::{
    x500::{DistinguishedName, X500DnHandler},
    Error, Result, X509Credential,
};

/// OID of the `commonName` attribute.
pub const COMMON_NAME_OID: &str = "2.5.4.3";

/// The kinds of subject alternative name, numbered after the `GeneralName`
/// CHOICE tags of RFC 5280.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum AltNameType {
    /// `otherName [0]`
    #[serde(rename = "other_name")]
    OtherName,

    /// `rfc822Name [1]` (email address)
    #[serde(rename = "rfc822")]
    Rfc822Name,

    /// `dNSName [2]`
    #[serde(rename = "dns")]
    DnsName,

    /// `x400Address [3]`
    #[serde(rename = "x400_address")]
    X400Address,

    /// `directoryName [4]`
    #[serde(rename = "directory_name")]
    DirectoryName,

    /// `ediPartyName [5]`
    #[serde(rename = "edi_party_name")]
    EdiPartyName,

    /// `uniformResourceIdentifier [6]`
    #[serde(rename = "uri")]
    Uri,

    /// `iPAddress [7]`
    #[serde(rename = "ip_address")]
    IpAddress,

    /// `registeredID [8]`
    #[serde(rename = "registered_id")]
    RegisteredId,
}

impl AltNameType {
    /// Return the context-specific tag number for this type.
    pub fn tag(self) -> u8 {
        match self {
            Self::OtherName => 0,
            Self::Rfc822Name => 1,
            Self::DnsName => 2,
            Self::X400Address => 3,
            Self::DirectoryName => 4,
            Self::EdiPartyName => 5,
            Self::Uri => 6,
            Self::IpAddress => 7,
            Self::RegisteredId => 8,
        }
    }

    /// Look up a type by its tag number.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => Self::OtherName,
            1 => Self::Rfc822Name,
            2 => Self::DnsName,
            3 => Self::X400Address,
            4 => Self::DirectoryName,
            5 => Self::EdiPartyName,
            6 => Self::Uri,
            7 => Self::IpAddress,
            8 => Self::RegisteredId,
            _ => return None,
        })
    }
}

/// Decode a single DER certificate.
pub fn parse_certificate(der: &[u8]) -> Result<X509Certificate<'_>> {
    let (_, cert) = x509_parser::parse_x509_certificate(der)
        .map_err(|e| Error::InvalidCertificate(e.to_string()))?;
    Ok(cert)
}

/// Decode a single DER certificate revocation list.
pub fn parse_crl(der: &[u8]) -> Result<CertificateRevocationList<'_>> {
    let (_, crl) =
        x509_parser::parse_x509_crl(der).map_err(|e| Error::InvalidCrl(e.to_string()))?;
    Ok(crl)
}

/// Return the values of all `commonName` attributes in the certificate's
/// subject, most specific first.
pub fn common_names(cert: &X509Certificate) -> Vec<String> {
    DistinguishedName::from_x509_name(cert.subject()).values_of(COMMON_NAME_OID)
}

/// Return the certificate's subject alternative names of the requested types
/// in the order they appear in the extension.
///
/// DNS names, URIs, email addresses, and registered IDs are returned as-is.
/// Directory names are formatted per RFC 2253 and IP addresses in their
/// usual textual form. Other name types have no string form and are not
/// returned.
pub fn alt_names(cert: &X509Certificate, types: &[AltNameType]) -> Result<Vec<String>> {
    let Some(san) = cert
        .subject_alternative_name()
        .map_err(|e| Error::InvalidCertificate(e.to_string()))?
    else {
        return Ok(vec![]);
    };

    let names = san
        .value
        .general_names
        .iter()
        .filter_map(|name| {
            let (kind, value) = match name {
                GeneralName::DNSName(s) => (AltNameType::DnsName, Some((*s).to_string())),
                GeneralName::URI(s) => (AltNameType::Uri, Some((*s).to_string())),
                GeneralName::RFC822Name(s) => (AltNameType::Rfc822Name, Some((*s).to_string())),
                GeneralName::DirectoryName(dn) => (
                    AltNameType::DirectoryName,
                    Some(DistinguishedName::from_x509_name(dn).to_string()),
                ),
                GeneralName::IPAddress(bytes) => (AltNameType::IpAddress, ip_to_string(bytes)),
                GeneralName::RegisteredID(oid) => {
                    (AltNameType::RegisteredId, Some(oid.to_id_string()))
                }
                GeneralName::OtherName(_, _) => (AltNameType::OtherName, None),
                GeneralName::X400Address(_) => (AltNameType::X400Address, None),
                GeneralName::EDIPartyName(_) => (AltNameType::EdiPartyName, None),
                _ => return None,
            };

            if types.contains(&kind) {
                value
            } else {
                None
            }
        })
        .collect();

    Ok(names)
}

/// Return the first common name followed by the subject alternative names of
/// the requested types.
pub fn subject_names(cert: &X509Certificate, types: &[AltNameType]) -> Result<Vec<String>> {
    let mut names: Vec<String> = common_names(cert).into_iter().take(1).collect();
    names.extend(alt_names(cert, types)?);
    Ok(names)
}

/// Build the token used to identify a credential in log messages:
/// `[subjectName='<dn>' |credential entityID='<id>']`.
pub fn identifiers_token(credential: &X509Credential, handler: &dyn X500DnHandler) -> String {
    let subject = credential
        .parsed_entity_certificate()
        .map(|cert| handler.name(&DistinguishedName::from_x509_name(cert.subject())))
        .unwrap_or_default();

    let mut token = format!("[subjectName='{subject}'");
    if let Some(entity_id) = credential
        .entity_id()
        .map(str::trim)
        .filter(|id| !id.is_empty())
    {
        token.push_str(&format!(" |credential entityID='{entity_id}'"));
    }
    token.push(']');
    token
}

/// Decode certificates from PEM (any number of `CERTIFICATE` blocks) or from a
/// single DER certificate. Each certificate is checked for well-formedness.
pub fn decode_certificates(data: &[u8]) -> Result<Vec<Vec<u8>>> {
    let ders = decode_pem_or_der(data, &["CERTIFICATE", "X509 CERTIFICATE"])
        .map_err(Error::InvalidCertificate)?;
    for der in &ders {
        parse_certificate(der)?;
    }
    Ok(ders)
}

/// Decode CRLs from PEM (any number of `X509 CRL` blocks) or from a single
/// DER CRL. Each CRL is checked for well-formedness.
pub fn decode_crls(data: &[u8]) -> Result<Vec<Vec<u8>>> {
    let ders = decode_pem_or_der(data, &["X509 CRL"]).map_err(Error::InvalidCrl)?;
    for der in &ders {
        parse_crl(der)?;
    }
    Ok(ders)
}

/// Return the Base64-encoded SHA-256 digest of a DER structure.
pub fn sha256_fingerprint(der: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(der))
}

fn decode_pem_or_der(data: &[u8], labels: &[&str]) -> std::result::Result<Vec<Vec<u8>>, String> {
    if !data.trim_ascii_start().starts_with(b"-----BEGIN") {
        return Ok(vec![data.to_vec()]);
    }

    let mut ders = vec![];
    for maybe_pem in Pem::iter_from_buffer(data) {
        let pem = maybe_pem.map_err(|e| e.to_string())?;
        if labels.contains(&pem.label.as_str()) {
            ders.push(pem.contents);
        }
    }
    Ok(ders)
}

fn ip_to_string(bytes: &[u8]) -> Option<String> {
    let addr = match bytes.len() {
        4 => IpAddr::V4(Ipv4Addr::from(<[u8; 4]>::try_from(bytes).ok()?)),
        16 => IpAddr::V6(Ipv6Addr::from(<[u8; 16]>::try_from(bytes).ok()?)),
        _ => return None,
    };
    Some(addr.to_string())
}
