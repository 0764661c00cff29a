bitflags::bitflags! {
    /// Protocol flags masking out or muting parts of the conversation.
    ///
    /// The `NO_*` bits ask the MTA to not send an event at all, the
    /// `NR_*` bits announce that a Continue verdict for the event will
    /// not be written back. The MDS bits advertise the MTA's maximum
    /// data size for a single packet.
    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    pub struct Protocol: u32 {
        /// MTA should not send connect info
        #[doc(alias = "SMFIP_NOCONNECT")]
        const NO_CONNECT = 0x0000_0001;
        /// MTA should not send HELO info
        #[doc(alias = "SMFIP_NOHELO")]
        const NO_HELO = 0x0000_0002;
        /// MTA should not send MAIL info
        #[doc(alias = "SMFIP_NOMAIL")]
        const NO_MAIL = 0x0000_0004;
        /// MTA should not send RCPT info
        #[doc(alias = "SMFIP_NORCPT")]
        const NO_RECIPIENT = 0x0000_0008;
        /// MTA should not send body chunks
        #[doc(alias = "SMFIP_NOBODY")]
        const NO_BODY = 0x0000_0010;
        /// MTA should not send headers
        #[doc(alias = "SMFIP_NOHDRS")]
        const NO_HEADER = 0x0000_0020;
        /// MTA should not send end-of-header
        #[doc(alias = "SMFIP_NOEOH")]
        const NO_END_OF_HEADER = 0x0000_0040;
        /// No reply for headers
        #[doc(alias = "SMFIP_NR_HDR")]
        const NR_HEADER = 0x0000_0080;
        /// MTA should not send unknown commands
        #[doc(alias = "SMFIP_NOUNKNOWN")]
        const NO_UNKNOWN = 0x0000_0100;
        /// MTA should not send DATA
        #[doc(alias = "SMFIP_NODATA")]
        const NO_DATA = 0x0000_0200;
        /// MTA understands the Skip verdict
        #[doc(alias = "SMFIP_SKIP")]
        const SKIP = 0x0000_0400;
        /// MTA should also send rejected recipients
        #[doc(alias = "SMFIP_RCPT_REJ")]
        const RCPT_REJECTED = 0x0000_0800;
        /// No reply for connect
        #[doc(alias = "SMFIP_NR_CONN")]
        const NR_CONNECT = 0x0000_1000;
        /// No reply for HELO
        #[doc(alias = "SMFIP_NR_HELO")]
        const NR_HELO = 0x0000_2000;
        /// No reply for MAIL
        #[doc(alias = "SMFIP_NR_MAIL")]
        const NR_MAIL = 0x0000_4000;
        /// No reply for RCPT
        #[doc(alias = "SMFIP_NR_RCPT")]
        const NR_RECIPIENT = 0x0000_8000;
        /// No reply for DATA
        #[doc(alias = "SMFIP_NR_DATA")]
        const NR_DATA = 0x0001_0000;
        /// No reply for unknown commands
        #[doc(alias = "SMFIP_NR_UNKN")]
        const NR_UNKNOWN = 0x0002_0000;
        /// No reply for end-of-header
        #[doc(alias = "SMFIP_NR_EOH")]
        const NR_END_OF_HEADER = 0x0004_0000;
        /// No reply for body chunks
        #[doc(alias = "SMFIP_NR_BODY")]
        const NR_BODY = 0x0008_0000;
        /// Header values are sent with their leading space
        #[doc(alias = "SMFIP_HDR_LEADSPC")]
        const HEADER_LEADING_SPACE = 0x0010_0000;
        /// MTA packets may carry up to 256 KiB of data
        #[doc(alias = "SMFIP_MDS_256K")]
        const MDS_256K = 0x1000_0000;
        /// MTA packets may carry up to 1 MiB of data
        #[doc(alias = "SMFIP_MDS_1M")]
        const MDS_1M = 0x2000_0000;
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Self::empty()
    }
}

impl Protocol {
    /// The default maximum data size of a single packet when no MDS bit
    /// is negotiated.
    pub const DEFAULT_MAX_DATA_SIZE: usize = 65535;

    /// The maximum packet data size implied by the MDS bits.
    #[must_use]
    pub fn max_data_size(&self) -> usize {
        if self.contains(Protocol::MDS_1M) {
            1024 * 1024
        } else if self.contains(Protocol::MDS_256K) {
            256 * 1024
        } else {
            Self::DEFAULT_MAX_DATA_SIZE
        }
    }
}
