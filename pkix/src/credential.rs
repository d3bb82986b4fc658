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

//! The X.509 credential whose trustworthiness is being evaluated.

use x509_parser::certificate::X509Certificate;

use crate::{
    x509_support::{parse_certificate, parse_crl},
    Result,
};

/// An untrusted end-entity certificate together with the certificates and
/// CRLs that were presented alongside it.
///
/// All certificates and CRLs are held in DER format and are checked for
/// well-formedness when they are added, so later stages can decode them
/// without having to report malformed input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct X509Credential {
    /// Certificate chain, leaf first. The first entry is always the entity
    /// certificate.
    chain: Vec<Vec<u8>>,

    crls: Vec<Vec<u8>>,

    entity_id: Option<String>,
}

impl X509Credential {
    /// Create a credential for a DER-encoded end-entity certificate.
    ///
    /// The certificate chain initially consists of just that certificate.
    pub fn new(entity_certificate_der: impl Into<Vec<u8>>) -> Result<Self> {
        let der = entity_certificate_der.into();
        parse_certificate(&der)?;

        Ok(Self {
            chain: vec![der],
            crls: vec![],
            entity_id: None,
        })
    }

    /// Replace the certificate chain with the given DER certificates, ordered
    /// leaf first.
    ///
    /// If the chain does not start with the entity certificate, the entity
    /// certificate is prepended.
    pub fn with_chain(mut self, chain: Vec<Vec<u8>>) -> Result<Self> {
        for der in &chain {
            parse_certificate(der)?;
        }

        let entity = std::mem::take(&mut self.chain)
            .into_iter()
            .next()
            .unwrap_or_default();

        self.chain = if chain.first() == Some(&entity) {
            chain
        } else {
            std::iter::once(entity).chain(chain).collect()
        };

        Ok(self)
    }

    /// Attach DER-encoded CRLs that were presented with the credential.
    pub fn with_crls(mut self, crls: Vec<Vec<u8>>) -> Result<Self> {
        for der in &crls {
            parse_crl(der)?;
        }

        self.crls = crls;
        Ok(self)
    }

    /// Record the identifier of the entity that owns this credential.
    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Return the DER encoding of the end-entity certificate.
    pub fn entity_certificate(&self) -> &[u8] {
        self.chain.first().map(Vec::as_slice).unwrap_or_default()
    }

    /// Return the certificate chain in DER format, leaf first.
    pub fn entity_certificate_chain(&self) -> &[Vec<u8>] {
        &self.chain
    }

    /// Return the CRLs presented with the credential in DER format.
    pub fn crls(&self) -> &[Vec<u8>] {
        &self.crls
    }

    /// Return the identifier of the entity that owns this credential, if known.
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub(crate) fn parsed_entity_certificate(&self) -> Result<X509Certificate<'_>> {
        parse_certificate(self.entity_certificate())
    }
}
