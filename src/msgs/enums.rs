//! Enums whose only use is inside handshake messages.

enum_builder! {
    /// The `ExtensionType` TLS protocol enum.
    @U16
    pub enum ExtensionType {
        ServerName => 0x0000,
        StatusRequest => 0x0005,
        SupportedGroups => 0x000a,
        SignatureAlgorithms => 0x000d,
        ALProtocolNegotiation => 0x0010,
        SCT => 0x0012,
        Padding => 0x0015,
        SessionTicket => 0x0023,
        PreSharedKey => 0x0029,
        EarlyData => 0x002a,
        SupportedVersions => 0x002b,
        Cookie => 0x002c,
        PSKKeyExchangeModes => 0x002d,
        CertificateAuthorities => 0x002f,
        SignatureAlgorithmsCert => 0x0032,
        KeyShare => 0x0033,
        RenegotiationInfo => 0xff01,
    }
}

enum_builder! {
    /// The `NamedGroup` TLS protocol enum.  Key exchange groups offered
    /// in `supported_groups` and selected via `key_share`.
    @U16
    pub enum NamedGroup {
        secp256r1 => 0x0017,
        secp384r1 => 0x0018,
        secp521r1 => 0x0019,
        X25519 => 0x001d,
        X448 => 0x001e,
        FFDHE2048 => 0x0100,
        FFDHE3072 => 0x0101,
        FFDHE4096 => 0x0102,
    }
}

enum_builder! {
    /// The `Compression` TLS protocol enum.  TLS 1.3 admits only `Null`.
    @U8
    pub enum Compression {
        Null => 0x00,
        Deflate => 0x01,
        LSZ => 0x40,
    }
}

enum_builder! {
    /// The `PskKeyExchangeMode` TLS protocol enum.
    @U8
    pub enum PskKeyExchangeMode {
        PSK_KE => 0x00,
        PSK_DHE_KE => 0x01,
    }
}

enum_builder! {
    /// The type prefix of a `server_name` extension entry; only
    /// `HostName` is defined.
    @U8
    pub enum ServerNameType {
        HostName => 0x00,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msgs::codec::Codec;

    #[test]
    fn extension_type_codes() {
        assert_eq!(u16::from(ExtensionType::PreSharedKey), 41);
        assert_eq!(u16::from(ExtensionType::SupportedVersions), 43);
        assert_eq!(u16::from(ExtensionType::KeyShare), 51);
    }

    #[test]
    fn named_group_encoding() {
        assert_eq!(NamedGroup::X25519.get_encoding(), &[0x00, 0x1d]);
        assert_eq!(NamedGroup::from(0x9999), NamedGroup::Unknown(0x9999));
    }
}
