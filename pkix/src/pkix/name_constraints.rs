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

//! Name constraints ([RFC 5280 section 4.2.1.10]) for DNS names, email
//! addresses, URIs, directory names and IP addresses.
//!
//! [RFC 5280 section 4.2.1.10]: https://datatracker.ietf.org/doc/html/rfc5280#section-4.2.1.10

use url::{Host, Url};
use x509_parser::extensions::{GeneralName, GeneralSubtree, NameConstraints};

use super::cert_store::PathCertificate;
use crate::x500::DistinguishedName;

const EMAIL_ADDRESS_OID: &str = "1.2.840.113549.1.9.1";

/// The names of a certificate that name constraints apply to.
#[derive(Default)]
struct ConstrainedNames {
    dns: Vec<String>,
    email: Vec<String>,
    uri_hosts: Vec<Option<String>>,
    directory: Vec<DistinguishedName>,
    ip: Vec<Vec<u8>>,
}

impl ConstrainedNames {
    fn of(cert: &PathCertificate) -> Self {
        let mut names = Self::default();

        if !cert.subject.is_empty() {
            names.directory.push(cert.subject.clone());
        }
        names.email.extend(
            cert.subject
                .values_of(EMAIL_ADDRESS_OID)
                .into_iter()
                .map(|e| e.to_ascii_lowercase()),
        );

        if let Ok(Some(san)) = cert.cert.subject_alternative_name() {
            for name in &san.value.general_names {
                match name {
                    GeneralName::DNSName(dns) => names.dns.push(dns.to_ascii_lowercase()),
                    GeneralName::RFC822Name(email) => names.email.push(email.to_ascii_lowercase()),
                    GeneralName::URI(uri) => names.uri_hosts.push(uri_host(uri)),
                    GeneralName::DirectoryName(dn) => {
                        names.directory.push(DistinguishedName::from_x509_name(dn))
                    }
                    GeneralName::IPAddress(ip) => names.ip.push(ip.to_vec()),
                    _ => {}
                }
            }
        }

        names
    }
}

/// Check the names of `cert` against the constraints imposed by a CA.
pub(crate) fn check_name_constraints(
    nc: &NameConstraints,
    cert: &PathCertificate,
) -> Result<(), String> {
    let names = ConstrainedNames::of(cert);

    if let Some(excluded) = &nc.excluded_subtrees {
        for subtree in excluded {
            if let Some(name) = first_match(subtree, &names) {
                return Err(format!("name {name} falls within an excluded subtree"));
            }
        }
    }

    if let Some(permitted) = &nc.permitted_subtrees {
        check_permitted(permitted, &names)?;
    }

    Ok(())
}

fn first_match(subtree: &GeneralSubtree, names: &ConstrainedNames) -> Option<String> {
    match &subtree.base {
        GeneralName::DNSName(c) => {
            let c = c.to_ascii_lowercase();
            names.dns.iter().find(|n| dns_matches(n, &c)).cloned()
        }
        GeneralName::RFC822Name(c) => {
            let c = c.to_ascii_lowercase();
            names.email.iter().find(|n| email_matches(n, &c)).cloned()
        }
        GeneralName::URI(c) => {
            let c = c.to_ascii_lowercase();
            names
                .uri_hosts
                .iter()
                .flatten()
                .find(|h| uri_host_matches(h, &c))
                .cloned()
        }
        GeneralName::DirectoryName(c) => {
            let base = DistinguishedName::from_x509_name(c);
            names
                .directory
                .iter()
                .find(|dn| dn.is_within_subtree(&base))
                .map(ToString::to_string)
        }
        GeneralName::IPAddress(c) => names
            .ip
            .iter()
            .find(|ip| ip_matches(ip, c))
            .map(|ip| hex::encode(ip)),
        _ => None,
    }
}

fn check_permitted(permitted: &[GeneralSubtree], names: &ConstrainedNames) -> Result<(), String> {
    let bases = || permitted.iter().map(|s| &s.base);

    let dns: Vec<String> = bases()
        .filter_map(|b| match b {
            GeneralName::DNSName(c) => Some(c.to_ascii_lowercase()),
            _ => None,
        })
        .collect();
    if !dns.is_empty() {
        if let Some(name) = names.dns.iter().find(|n| !dns.iter().any(|c| dns_matches(n, c))) {
            return Err(format!("DNS name {name} is not within a permitted subtree"));
        }
    }

    let email: Vec<String> = bases()
        .filter_map(|b| match b {
            GeneralName::RFC822Name(c) => Some(c.to_ascii_lowercase()),
            _ => None,
        })
        .collect();
    if !email.is_empty() {
        if let Some(name) = names
            .email
            .iter()
            .find(|n| !email.iter().any(|c| email_matches(n, c)))
        {
            return Err(format!("email address {name} is not within a permitted subtree"));
        }
    }

    let uri: Vec<String> = bases()
        .filter_map(|b| match b {
            GeneralName::URI(c) => Some(c.to_ascii_lowercase()),
            _ => None,
        })
        .collect();
    if !uri.is_empty() {
        let outside = names.uri_hosts.iter().any(|host| match host {
            Some(h) => !uri.iter().any(|c| uri_host_matches(h, c)),
            None => true,
        });
        if outside {
            return Err("URI is not within a permitted subtree".to_string());
        }
    }

    let directory: Vec<DistinguishedName> = bases()
        .filter_map(|b| match b {
            GeneralName::DirectoryName(c) => Some(DistinguishedName::from_x509_name(c)),
            _ => None,
        })
        .collect();
    if !directory.is_empty() {
        if let Some(dn) = names
            .directory
            .iter()
            .find(|dn| !directory.iter().any(|base| dn.is_within_subtree(base)))
        {
            return Err(format!("directory name {dn} is not within a permitted subtree"));
        }
    }

    let ip: Vec<&[u8]> = bases()
        .filter_map(|b| match b {
            GeneralName::IPAddress(c) => Some(*c),
            _ => None,
        })
        .collect();
    if !ip.is_empty() {
        if let Some(addr) = names.ip.iter().find(|a| !ip.iter().any(|c| ip_matches(a, c))) {
            return Err(format!(
                "IP address {} is not within a permitted subtree",
                hex::encode(addr)
            ));
        }
    }

    Ok(())
}

/// `example.com` matches the domain and its subdomains; `.example.com`
/// matches subdomains only.
pub(crate) fn dns_matches(name: &str, constraint: &str) -> bool {
    if constraint.is_empty() {
        return true;
    }
    if constraint.starts_with('.') {
        return name.ends_with(constraint);
    }
    name == constraint
        || (name.len() > constraint.len()
            && name.ends_with(constraint)
            && name.as_bytes().get(name.len() - constraint.len() - 1) == Some(&b'.'))
}

/// A constraint containing `@` is a mailbox; otherwise it names a host
/// (exactly) or a domain (`.example.com`, subdomains only).
pub(crate) fn email_matches(email: &str, constraint: &str) -> bool {
    if constraint.contains('@') {
        return email == constraint;
    }
    let Some((_, host)) = email.rsplit_once('@') else {
        return false;
    };
    if constraint.starts_with('.') {
        host.ends_with(constraint)
    } else {
        host == constraint
    }
}

/// URI constraints name a host (exactly) or a domain (`.example.com`).
pub(crate) fn uri_host_matches(host: &str, constraint: &str) -> bool {
    if constraint.starts_with('.') {
        host.ends_with(constraint)
    } else {
        host == constraint
    }
}

/// IP constraints hold an address followed by a mask of the same length.
pub(crate) fn ip_matches(ip: &[u8], constraint: &[u8]) -> bool {
    if constraint.len() != ip.len() * 2 || (ip.len() != 4 && ip.len() != 16) {
        return false;
    }
    let (addr, mask) = constraint.split_at(ip.len());
    ip.iter()
        .zip(addr)
        .zip(mask)
        .all(|((ip, a), m)| (ip & m) == (a & m))
}

/// Extract the lowercase host from an absolute URI with an authority.
pub(crate) fn uri_host(uri: &str) -> Option<String> {
    let url = Url::parse(uri).ok()?;
    let host = match url.host()? {
        Host::Domain(domain) => domain.to_ascii_lowercase(),
        Host::Ipv4(addr) => addr.to_string(),
        Host::Ipv6(addr) => addr.to_string(),
    };
    (!host.is_empty()).then_some(host)
}
