bitflags::bitflags! {
    /// The modification actions a milter may request at end-of-body.
    ///
    /// Sendmail docs call this the "actions" field of option
    /// negotiation. A filter declares the superset of what it might do;
    /// requesting a modification outside the declared set is an error.
    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    pub struct Capability: u32 {
        /// May add headers
        #[doc(alias = "SMFIF_ADDHDRS")]
        const ADD_HEADER = 0x0000_0001;
        /// May replace the body
        #[doc(alias = "SMFIF_CHGBODY")]
        const CHANGE_BODY = 0x0000_0002;
        /// May add recipients
        #[doc(alias = "SMFIF_ADDRCPT")]
        const ADD_RECIPIENT = 0x0000_0004;
        /// May delete recipients
        #[doc(alias = "SMFIF_DELRCPT")]
        const DELETE_RECIPIENT = 0x0000_0008;
        /// May change or delete headers
        #[doc(alias = "SMFIF_CHGHDRS")]
        const CHANGE_HEADER = 0x0000_0010;
        /// May quarantine the message
        #[doc(alias = "SMFIF_QUARANTINE")]
        const QUARANTINE = 0x0000_0020;
        /// May change the envelope sender
        #[doc(alias = "SMFIF_CHGFROM")]
        const CHANGE_FROM = 0x0000_0040;
        /// May add recipients including ESMTP arguments
        #[doc(alias = "SMFIF_ADDRCPT_PAR")]
        const ADD_RECIPIENT_EXT = 0x0000_0080;
        /// May send the set of macros it wants
        #[doc(alias = "SMFIF_SETSYMLIST")]
        const SET_MACRO_LIST = 0x0000_0100;
    }
}

impl Default for Capability {
    /// Enables all capabilities per default
    fn default() -> Self {
        Capability::all()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_bits_round_trip() {
        let bits = Capability::ADD_HEADER | Capability::QUARANTINE;

        assert_eq!(Some(bits), Capability::from_bits(bits.bits()));
        assert_eq!(0x21, bits.bits());
    }

    #[test]
    fn unknown_bits_are_rejected_by_strict_parse() {
        assert!(Capability::from_bits(0x8000_0000).is_none());
    }
}
