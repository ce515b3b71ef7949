//! Signed attributes and RSA key helpers for CMS signatures over document
//! content.
//!
//! The attribute builders return `x509_cert::attr::Attribute` values ready to
//! be collected into a [`SignedAttributes`] set. The DER of that set is what
//! a signer hashes and passes to [`raw_private_key_transform`].

use super::context::CryptoContext;
use super::digest::{HashingAlgorithm, OID_SHA256};
use crate::error::{PdfError, Result};
use der::asn1::{GeneralizedTime, ObjectIdentifier, OctetString, SetOfVec, UtcTime};
use der::{Any, DateTime, Decode, Encode, EncodeValue, Sequence, Tagged};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use std::time::SystemTime;
use x509_cert::Certificate;
use x509_cert::attr::Attribute;
use x509_cert::spki::AlgorithmIdentifierOwned;
use x509_cert::time::Time;
use zeroize::Zeroizing;

/// PKCS#9 content-type.
pub const OID_CONTENT_TYPE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");
/// PKCS#9 message-digest.
pub const OID_MESSAGE_DIGEST: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");
/// PKCS#9 signing-time.
pub const OID_SIGNING_TIME: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5");
/// id-aa-signingCertificateV2 (RFC 5035).
pub const OID_SIGNING_CERTIFICATE_V2: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.2.47");
/// id-data, the content type of detached PDF signatures.
pub const OID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");

/// Bytes of PKCS#1 v1.5 type-1 overhead (00 01 PS>=8 00).
const PKCS1_OVERHEAD: usize = 11;

/// `ESSCertIDv2` without the optional issuer serial.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct EssCertIdV2 {
    /// Absent when the hash is SHA-256, the DER default.
    #[asn1(optional = "true")]
    pub hash_algorithm: Option<AlgorithmIdentifierOwned>,
    pub cert_hash: OctetString,
}

/// `SigningCertificateV2` without policies.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SigningCertificateV2 {
    pub certs: Vec<EssCertIdV2>,
}

fn single_valued<T: EncodeValue + Tagged>(oid: ObjectIdentifier, value: &T) -> Result<Attribute> {
    let values = SetOfVec::try_from(vec![Any::encode_from(value)?])?;
    Ok(Attribute { oid, values })
}

/// signingCertificateV2 attribute from a precomputed certificate hash.
pub fn signing_certificate_v2_attribute(
    cert_hash: &[u8],
    algorithm: HashingAlgorithm,
) -> Result<Attribute> {
    let expected = algorithm.digest_len()?;
    if cert_hash.len() != expected {
        return Err(PdfError::config(format!(
            "{algorithm} certificate hash must be {expected} bytes, got {}",
            cert_hash.len()
        )));
    }
    let oid = algorithm.oid()?;
    let hash_algorithm = (oid != OID_SHA256).then(|| AlgorithmIdentifierOwned {
        oid,
        parameters: None,
    });
    let attr = SigningCertificateV2 {
        certs: vec![EssCertIdV2 {
            hash_algorithm,
            cert_hash: OctetString::new(cert_hash)?,
        }],
    };
    single_valued(OID_SIGNING_CERTIFICATE_V2, &attr)
}

/// signingCertificateV2 attribute for a DER certificate, hashed through `ctx`.
pub fn signing_certificate_v2_attribute_for(
    ctx: &CryptoContext,
    cert_der: &[u8],
    algorithm: HashingAlgorithm,
) -> Result<Attribute> {
    let hash = ctx.compute_digest(cert_der, algorithm)?;
    signing_certificate_v2_attribute(&hash, algorithm)
}

/// Signing-time attribute. UTCTime before 2050, GeneralizedTime from then on.
pub fn signing_time_attribute(time: SystemTime) -> Result<Attribute> {
    let date = DateTime::from_system_time(time)?;
    let value = if date.year() < 2050 {
        Time::UtcTime(UtcTime::from_date_time(date)?)
    } else {
        Time::GeneralTime(GeneralizedTime::from_date_time(date))
    };
    single_valued(OID_SIGNING_TIME, &value)
}

pub fn message_digest_attribute(digest: &[u8]) -> Result<Attribute> {
    single_valued(OID_MESSAGE_DIGEST, &OctetString::new(digest)?)
}

/// Content-type attribute set to id-data.
pub fn content_type_attribute() -> Result<Attribute> {
    single_valued(OID_CONTENT_TYPE, &OID_DATA)
}

/// Signed attributes, each type present at most once.
#[derive(Clone, Debug, Default)]
pub struct SignedAttributes {
    attrs: Vec<Attribute>,
}

impl SignedAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// The usual set for a detached PDF signature: content-type, signing time,
    /// message digest of `content` and the signer's certificate reference.
    pub fn for_content(
        ctx: &CryptoContext,
        content: &[u8],
        cert_der: &[u8],
        algorithm: HashingAlgorithm,
        time: SystemTime,
    ) -> Result<Self> {
        let digest = ctx.compute_digest(content, algorithm)?;
        let mut attrs = Self::new();
        attrs
            .add(content_type_attribute()?)?
            .add(signing_time_attribute(time)?)?
            .add(message_digest_attribute(&digest)?)?
            .add(signing_certificate_v2_attribute_for(ctx, cert_der, algorithm)?)?;
        Ok(attrs)
    }

    pub fn add(&mut self, attr: Attribute) -> Result<&mut Self> {
        if self.get(&attr.oid).is_some() {
            return Err(PdfError::usage(format!("attribute {} already present", attr.oid)));
        }
        self.attrs.push(attr);
        Ok(self)
    }

    pub fn get(&self, oid: &ObjectIdentifier) -> Option<&Attribute> {
        self.attrs.iter().find(|attr| &attr.oid == oid)
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attrs.iter()
    }

    /// DER `SET OF Attribute`, the bytes covered by the signature.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        let set = SetOfVec::try_from(self.attrs.clone())?;
        Ok(set.to_der()?)
    }
}

/// PKCS#1 v1.5 type-1 padding plus the RSA private-key operation on `input`,
/// with no DigestInfo prefix added. The result is as long as the modulus.
pub fn raw_private_key_transform(input: &[u8], key: &RsaPrivateKey) -> Result<Vec<u8>> {
    let size = key.size();
    if input.len() + PKCS1_OVERHEAD > size {
        return Err(PdfError::engine(format!(
            "input of {} bytes does not fit a {size}-byte RSA modulus",
            input.len()
        )));
    }
    let signature = key.sign(Pkcs1v15Sign::new_unprefixed(), input)?;
    if signature.len() != size {
        return Err(PdfError::engine(format!(
            "RSA transform produced {} bytes, expected {size}",
            signature.len()
        )));
    }
    Ok(signature)
}

pub fn load_certificate(der: &[u8]) -> Result<Certificate> {
    Ok(Certificate::from_der(der)?)
}

/// Parse a PKCS#1 `RSAPrivateKey`.
pub fn load_private_key(der: &[u8]) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs1_der(der).map_err(pkcs1_error)
}

/// DER encoding of an X.509 certificate.
pub fn export_certificate(cert: &Certificate) -> Result<Vec<u8>> {
    Ok(cert.to_der()?)
}

/// PKCS#1 `RSAPrivateKey` DER, wiped when dropped.
pub fn export_private_key(key: &RsaPrivateKey) -> Result<Zeroizing<Vec<u8>>> {
    let doc = key.to_pkcs1_der().map_err(pkcs1_error)?;
    Ok(Zeroizing::new(doc.as_bytes().to_vec()))
}

fn pkcs1_error(err: rsa::pkcs1::Error) -> PdfError {
    match err {
        rsa::pkcs1::Error::Asn1(err) => PdfError::Asn1(err),
        other => PdfError::engine(format!("PKCS#1 key error: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn first_value<T: for<'a> Decode<'a>>(attr: &Attribute) -> T {
        assert_eq!(attr.values.len(), 1);
        let value = attr.values.iter().next().unwrap();
        T::from_der(&value.to_der().unwrap()).unwrap()
    }

    #[test]
    fn sha256_cert_id_omits_algorithm() {
        let attr = signing_certificate_v2_attribute(&[0xAB; 32], HashingAlgorithm::Sha256).unwrap();
        assert_eq!(attr.oid, OID_SIGNING_CERTIFICATE_V2);
        let parsed: SigningCertificateV2 = first_value(&attr);
        assert!(parsed.certs[0].hash_algorithm.is_none());
        assert_eq!(parsed.certs[0].cert_hash.as_bytes(), &[0xAB; 32]);
    }

    #[test]
    fn sha512_cert_id_names_algorithm() {
        let attr = signing_certificate_v2_attribute(&[1; 64], HashingAlgorithm::Sha512).unwrap();
        let parsed: SigningCertificateV2 = first_value(&attr);
        let alg = parsed.certs[0].hash_algorithm.as_ref().unwrap();
        assert_eq!(alg.oid, crate::crypto::digest::OID_SHA512);
    }

    #[test]
    fn cert_hash_length_is_checked() {
        let err = signing_certificate_v2_attribute(&[1; 32], HashingAlgorithm::Sha384).unwrap_err();
        assert!(err.is_configuration());
        let err = signing_certificate_v2_attribute(&[1; 32], HashingAlgorithm::Unknown).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn signing_time_switches_at_2050() {
        // 2049-12-31T23:59:59Z and 2050-01-01T00:00:00Z
        let before = UNIX_EPOCH + Duration::from_secs(2_524_607_999);
        let after = UNIX_EPOCH + Duration::from_secs(2_524_608_000);

        let value = signing_time_attribute(before).unwrap();
        let time: Time = first_value(&value);
        assert!(matches!(time, Time::UtcTime(_)));

        let value = signing_time_attribute(after).unwrap();
        let time: Time = first_value(&value);
        assert!(matches!(time, Time::GeneralTime(_)));
    }

    #[test]
    fn duplicate_attribute_is_usage_error() {
        let mut attrs = SignedAttributes::new();
        attrs.add(content_type_attribute().unwrap()).unwrap();
        let err = attrs.add(content_type_attribute().unwrap()).unwrap_err();
        assert!(err.is_usage());
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn content_type_is_id_data() {
        let attr = content_type_attribute().unwrap();
        let oid: ObjectIdentifier = first_value(&attr);
        assert_eq!(oid, OID_DATA);
    }
}
