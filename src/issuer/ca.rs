//! CA-backed client certificate issuer.

use ::time::OffsetDateTime;
use anyhow::{anyhow, Context, Result};
use p256::ecdsa::{DerSignature, SigningKey};
use p256::pkcs8::{DecodePrivateKey, EncodePublicKey};
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, DnValue, IsCa, KeyPair,
    KeyUsagePurpose,
};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::builder::{Builder, CertificateBuilder, Profile};
use x509_cert::der::asn1::{Ia5String, SetOfVec};
use x509_cert::der::oid::ObjectIdentifier;
use x509_cert::der::pem::LineEnding;
use x509_cert::der::{Any, Decode, EncodePem, Tag};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{ExtendedKeyUsage, SubjectAltName};
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::{Time, Validity};
use x509_cert::Certificate;
use x509_parser::pem::parse_x509_pem;

use super::config::IssuerConfig;
use crate::credential::{CertIssuer, IssuedPem, Subject};

/// How far `not_before` is pushed into the past to absorb clock skew.
const CERT_BACKDATE: Duration = Duration::from_secs(5 * 60);

const ID_AT_COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
const ID_AT_ORGANIZATION_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
const ID_KP_CLIENT_AUTH: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.2");

/// Signs short-lived client certificates with a local CA.
///
/// The CA key must be ECDSA P-256.
pub struct CaIssuer {
    /// CA certificate as presented to clients.
    ca_cert_pem: String,
    /// Subject of the CA, used verbatim as the issuer of every leaf.
    issuer_name: Name,
    ca_key: SigningKey,
}

impl CaIssuer {
    /// Create an issuer from configuration: load the CA from disk or generate one.
    pub fn from_config(config: &IssuerConfig) -> Result<Self> {
        match (&config.ca_cert_path, &config.ca_key_path) {
            (Some(cert_path), Some(key_path)) => {
                let cert_pem = std::fs::read_to_string(cert_path)
                    .with_context(|| format!("Failed to read CA certificate: {:?}", cert_path))?;
                let key_pem = std::fs::read_to_string(key_path)
                    .with_context(|| format!("Failed to read CA key: {:?}", key_path))?;
                Self::from_pem(&cert_pem, &key_pem)
            }
            (None, None) => Self::generate(
                &config.ca_common_name,
                Duration::from_secs(config.ca_ttl_secs),
            ),
            _ => Err(anyhow!("ca_cert_path and ca_key_path must be set together")),
        }
    }

    /// Generate an ephemeral self-signed CA.
    pub fn generate(common_name: &str, ttl: Duration) -> Result<Self> {
        let ca_key = KeyPair::generate().context("Failed to generate CA key")?;

        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, DnValue::Utf8String(common_name.to_string()));
        params.distinguished_name = dn;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let now = OffsetDateTime::now_utc();
        let lifetime = ::time::Duration::try_from(ttl)
            .map_err(|e| anyhow!("CA lifetime out of range: {}", e))?;
        params.not_before = now - CERT_BACKDATE;
        params.not_after = now
            .checked_add(lifetime)
            .ok_or_else(|| anyhow!("CA lifetime out of range: {}s", ttl.as_secs()))?;

        let ca_cert = params
            .self_signed(&ca_key)
            .context("Failed to self-sign CA certificate")?;

        info!(common_name = %common_name, ttl_secs = ttl.as_secs(), "Generated ephemeral CA");

        Self::from_parts(ca_cert.pem(), ca_cert.der().as_ref(), &ca_key)
    }

    /// Load an existing CA from PEM certificate and key.
    pub fn from_pem(cert_pem: &str, key_pem: &str) -> Result<Self> {
        let cert_der = inspect_ca_certificate(cert_pem)?;
        let ca_key = KeyPair::from_pem(key_pem).context("Failed to parse CA private key")?;

        Self::from_parts(cert_pem.trim().to_string() + "\n", &cert_der, &ca_key)
    }

    fn from_parts(ca_cert_pem: String, cert_der: &[u8], ca_key: &KeyPair) -> Result<Self> {
        let cert = Certificate::from_der(cert_der)
            .map_err(|e| anyhow!("Failed to decode CA certificate: {}", e))?;
        let ca_key = signing_key(ca_key)?;

        let ca_public = public_key_info(&ca_key)?;
        if ca_public.subject_public_key.raw_bytes()
            != cert
                .tbs_certificate
                .subject_public_key_info
                .subject_public_key
                .raw_bytes()
        {
            return Err(anyhow!("CA key does not match CA certificate"));
        }

        Ok(Self {
            ca_cert_pem,
            issuer_name: cert.tbs_certificate.subject,
            ca_key,
        })
    }

    /// CA bundle clients use to verify issued certificates.
    pub fn ca_bundle_pem(&self) -> &str {
        &self.ca_cert_pem
    }
}

impl CertIssuer for CaIssuer {
    fn issue_pem(&self, subject: &Subject, dns_names: &[String], ttl: Duration) -> Result<IssuedPem> {
        let key_pair = KeyPair::generate().context("Failed to generate client key")?;
        let public_key = public_key_info(&signing_key(&key_pair)?)?;

        let now = SystemTime::now();
        let not_after = now
            .checked_add(ttl)
            .ok_or_else(|| anyhow!("Certificate lifetime out of range: {}s", ttl.as_secs()))?;
        let validity = Validity {
            not_before: x509_time(now - CERT_BACKDATE)?,
            not_after: x509_time(not_after)?,
        };

        let profile = Profile::Leaf {
            issuer: self.issuer_name.clone(),
            enable_key_agreement: false,
            enable_key_encipherment: false,
        };
        let mut builder = CertificateBuilder::new(
            profile,
            random_serial()?,
            validity,
            subject_name(subject)?,
            public_key,
            &self.ca_key,
        )
        .map_err(|e| anyhow!("Failed to prepare client certificate: {}", e))?;

        builder
            .add_extension(&ExtendedKeyUsage(vec![ID_KP_CLIENT_AUTH]))
            .map_err(|e| anyhow!("Failed to add extended key usage: {}", e))?;

        if !dns_names.is_empty() {
            let names = dns_names
                .iter()
                .map(|name| Ia5String::new(name).map(GeneralName::DnsName))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| anyhow!("Invalid DNS name: {}", e))?;
            builder
                .add_extension(&SubjectAltName(names))
                .map_err(|e| anyhow!("Failed to add subject alternative names: {}", e))?;
        }

        let cert = builder
            .build::<DerSignature>()
            .map_err(|e| anyhow!("Failed to sign client certificate: {}", e))?;
        let certificate = cert
            .to_pem(LineEnding::LF)
            .map_err(|e| anyhow!("Failed to encode client certificate: {}", e))?;

        debug!(
            common_name = %subject.common_name,
            groups = subject.organizations.len(),
            ttl_secs = ttl.as_secs(),
            "Issued client certificate"
        );

        Ok(IssuedPem {
            certificate,
            private_key: key_pair.serialize_pem(),
        })
    }
}

/// `O` for every group, then `CN`. Each attribute gets its own RDN.
fn subject_name(subject: &Subject) -> Result<Name> {
    let mut rdns = Vec::with_capacity(subject.organizations.len() + 1);
    for organization in &subject.organizations {
        rdns.push(rdn(ID_AT_ORGANIZATION_NAME, organization)?);
    }
    rdns.push(rdn(ID_AT_COMMON_NAME, &subject.common_name)?);
    Ok(RdnSequence(rdns))
}

fn rdn(oid: ObjectIdentifier, value: &str) -> Result<RelativeDistinguishedName> {
    let value = Any::new(Tag::Utf8String, value.as_bytes())
        .map_err(|e| anyhow!("Invalid subject attribute: {}", e))?;
    let attributes = SetOfVec::try_from(vec![AttributeTypeAndValue { oid, value }])
        .map_err(|e| anyhow!("Invalid subject attribute: {}", e))?;
    Ok(RelativeDistinguishedName(attributes))
}

fn x509_time(at: SystemTime) -> Result<Time> {
    Time::try_from(at).map_err(|e| anyhow!("Certificate time out of range: {}", e))
}

fn signing_key(key_pair: &KeyPair) -> Result<SigningKey> {
    SigningKey::from_pkcs8_der(&key_pair.serialize_der())
        .map_err(|e| anyhow!("Unsupported key, expected ECDSA P-256: {}", e))
}

fn public_key_info(key: &SigningKey) -> Result<SubjectPublicKeyInfoOwned> {
    let der = key
        .verifying_key()
        .to_public_key_der()
        .map_err(|e| anyhow!("Failed to encode public key: {}", e))?;
    SubjectPublicKeyInfoOwned::from_der(der.as_bytes())
        .map_err(|e| anyhow!("Failed to decode public key: {}", e))
}

/// Positive 128-bit serial.
fn random_serial() -> Result<SerialNumber> {
    let mut bytes = *uuid::Uuid::new_v4().as_bytes();
    bytes[0] = (bytes[0] & 0x7f).max(1);
    SerialNumber::new(&bytes).map_err(|e| anyhow!("Invalid serial number: {}", e))
}

/// Refuse CA certificates that cannot sign or are outside their validity.
///
/// Returns the DER encoding of the certificate.
fn inspect_ca_certificate(cert_pem: &str) -> Result<Vec<u8>> {
    let (_, pem) = parse_x509_pem(cert_pem.as_bytes())
        .map_err(|e| anyhow!("Invalid CA certificate PEM: {:?}", e))?;
    let cert = pem
        .parse_x509()
        .map_err(|e| anyhow!("Failed to parse X.509 CA certificate: {:?}", e))?;

    if !cert.is_ca() {
        return Err(anyhow!("Certificate is not a CA: {}", cert.subject()));
    }
    if !cert.validity().is_valid() {
        return Err(anyhow!(
            "CA certificate is not currently valid: {}",
            cert.subject()
        ));
    }

    info!(
        subject_dn = %cert.subject(),
        not_after = cert.validity().not_after.timestamp(),
        "Loaded CA certificate"
    );
    Ok(pem.contents.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use x509_parser::prelude::{FromDer, GeneralName as ParsedGeneralName, X509Certificate};

    fn parse_leaf(pem: &str) -> (Vec<u8>, i64, i64) {
        let (_, pem) = parse_x509_pem(pem.as_bytes()).unwrap();
        let cert = pem.parse_x509().unwrap();
        (
            pem.contents.clone(),
            cert.validity().not_before.timestamp(),
            cert.validity().not_after.timestamp(),
        )
    }

    fn organizations(der: &[u8]) -> Vec<String> {
        let (_, cert) = X509Certificate::from_der(der).unwrap();
        cert.subject()
            .iter_organization()
            .filter_map(|o| o.as_str().ok())
            .map(String::from)
            .collect()
    }

    fn alice() -> Subject {
        Subject {
            common_name: "alice".to_string(),
            organizations: vec!["group1".to_string()],
        }
    }

    fn disk_ca(key: &KeyPair) -> String {
        let mut params = CertificateParams::default();
        params
            .distinguished_name
            .push(DnType::CommonName, DnValue::Utf8String("disk-ca".to_string()));
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign];
        params.self_signed(key).unwrap().pem()
    }

    #[test]
    fn test_issue_client_certificate() {
        let issuer = CaIssuer::generate("test-ca", Duration::from_secs(3600)).unwrap();
        let issued = issuer
            .issue_pem(&alice(), &[], Duration::from_secs(3600))
            .unwrap();

        assert!(issued.certificate.contains("BEGIN CERTIFICATE"));
        assert!(issued.private_key.contains("PRIVATE KEY"));

        let (der, not_before, not_after) = parse_leaf(&issued.certificate);
        let (_, cert) = X509Certificate::from_der(&der).unwrap();

        let cn: Vec<_> = cert
            .subject()
            .iter_common_name()
            .filter_map(|cn| cn.as_str().ok())
            .collect();
        assert_eq!(cn, vec!["alice"]);
        assert_eq!(organizations(&der), vec!["group1"]);

        assert_eq!(cert.issuer().to_string(), "CN=test-ca");
        assert!(!cert.is_ca());
        assert!(cert.subject_alternative_name().unwrap().is_none());

        let eku = cert.extended_key_usage().unwrap().expect("eku");
        assert!(eku.value.client_auth);
        assert!(!eku.value.server_auth);

        // Backdated by five minutes, valid for one hour from now.
        assert_eq!(not_after - not_before, 3600 + 300);
    }

    #[test]
    fn test_every_group_is_an_organization() {
        let issuer = CaIssuer::generate("test-ca", Duration::from_secs(3600)).unwrap();
        let subject = Subject {
            common_name: "alice".to_string(),
            organizations: vec!["group1".to_string(), "group2".to_string()],
        };
        let issued = issuer.issue_pem(&subject, &[], Duration::from_secs(60)).unwrap();

        let (der, _, _) = parse_leaf(&issued.certificate);
        assert_eq!(organizations(&der), vec!["group1", "group2"]);
    }

    #[test]
    fn test_each_issue_uses_fresh_key() {
        let issuer = CaIssuer::generate("test-ca", Duration::from_secs(3600)).unwrap();
        let first = issuer.issue_pem(&alice(), &[], Duration::from_secs(60)).unwrap();
        let second = issuer.issue_pem(&alice(), &[], Duration::from_secs(60)).unwrap();

        assert_ne!(first.private_key, second.private_key);
        assert_ne!(first.certificate, second.certificate);
    }

    #[test]
    fn test_issue_with_dns_names() {
        let issuer = CaIssuer::generate("test-ca", Duration::from_secs(3600)).unwrap();
        let issued = issuer
            .issue_pem(&alice(), &["svc.example.com".to_string()], Duration::from_secs(60))
            .unwrap();

        let (der, _, _) = parse_leaf(&issued.certificate);
        let (_, cert) = X509Certificate::from_der(&der).unwrap();
        let san = cert.subject_alternative_name().unwrap().expect("san");
        assert!(san
            .value
            .general_names
            .iter()
            .any(|n| matches!(n, ParsedGeneralName::DNSName("svc.example.com"))));
    }

    #[test]
    fn test_no_groups() {
        let issuer = CaIssuer::generate("test-ca", Duration::from_secs(3600)).unwrap();
        let subject = Subject {
            common_name: "bob".to_string(),
            organizations: vec![],
        };
        let issued = issuer.issue_pem(&subject, &[], Duration::from_secs(60)).unwrap();

        let (der, _, _) = parse_leaf(&issued.certificate);
        assert!(organizations(&der).is_empty());
    }

    #[test]
    fn test_out_of_range_ttl_is_an_error() {
        let issuer = CaIssuer::generate("test-ca", Duration::from_secs(3600)).unwrap();
        let result = issuer.issue_pem(&alice(), &[], Duration::from_secs(1_000_000_000_000));
        assert!(result.is_err());

        assert!(CaIssuer::generate("test-ca", Duration::from_secs(u64::MAX)).is_err());
    }

    #[test]
    fn test_load_ca_from_pem() {
        let key = KeyPair::generate().unwrap();
        let ca_pem = disk_ca(&key);

        let issuer = CaIssuer::from_pem(&ca_pem, &key.serialize_pem()).unwrap();
        assert!(issuer.ca_bundle_pem().contains("BEGIN CERTIFICATE"));

        let issued = issuer.issue_pem(&alice(), &[], Duration::from_secs(60)).unwrap();
        let (der, _, _) = parse_leaf(&issued.certificate);
        let (_, cert) = X509Certificate::from_der(&der).unwrap();
        assert_eq!(cert.issuer().to_string(), "CN=disk-ca");
    }

    #[test]
    fn test_reject_mismatched_ca_key() {
        let key = KeyPair::generate().unwrap();
        let other = KeyPair::generate().unwrap();
        let ca_pem = disk_ca(&key);

        let result = CaIssuer::from_pem(&ca_pem, &other.serialize_pem());
        assert!(result.is_err());
    }

    #[test]
    fn test_reject_non_ca_certificate() {
        let key = KeyPair::generate().unwrap();
        let params = CertificateParams::new(vec!["leaf.example.com".to_string()]).unwrap();
        let leaf = params.self_signed(&key).unwrap();

        let result = CaIssuer::from_pem(&leaf.pem(), &key.serialize_pem());
        assert!(result.is_err());
    }

    #[test]
    fn test_from_config_generates_ca() {
        let config = IssuerConfig {
            ca_common_name: "generated-ca".to_string(),
            ..Default::default()
        };
        let issuer = CaIssuer::from_config(&config).unwrap();
        assert!(issuer.ca_bundle_pem().contains("BEGIN CERTIFICATE"));
    }
}
