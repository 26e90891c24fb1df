//! The curated list of known educational channels and the known/other split.

use std::collections::HashSet;

use crate::models::{Channel, ChannelIdSet};

/// Hand-maintained educational channels, originally found through the random
/// channel generator. They seed discovery and are reported first.
pub const KNOWN_CHANNEL_IDS: &[&str] = &[
    "UC4a-Gbdw7vOaccHmFo40b9g", "UCYO_jab_esuFRV4b17AJtAw", "UCBcljXmuXPok9kT_VGA3adg",
    "UCJDIGW0ywWw9Kh9_vtwqxXA", "UCEBb1b_L6zDS3xTUrIALZOw", "UCoHhuummRZaIVX7bD4t2czg",
    "UC9-y-6csu5WGm29I7JiwpnA", "UC5029sGTV3cQWk9gh90X6-Q", "UC2Few2jF7zWvuxtXgoyat8g",
    "UCcF_QqLWOatOO5vHHlzK_Hw", "UCq0EGvLTyy-LLT1oUSO_0FQ", "UCoxcjq-8xIDTYp3uz647V5A",
    "UCLv7Gzc3VTO6ggFlXY0sOyw", "UC4EY_qnSeAP1xGsh61eOoJA", "UCmdTJKCLBVMQdPC3_kE7t1w",
    "UCLnGGRG__uGSPLBLzyhg8dQ", "UC-EnprmCZ3OXyAoG7vjVNCA", "UCYgL81lc7DOLNhnel1_J6Vg",
    "UCThyZpUXvT1atGZ0P1-2Vng", "UCIJ7ElhHMlz9lKh8_-dh4rA", "UC4XB8AQCiucZ7324-UaYA4A",
    "UC6KD6HqLbd24LOI26GeHeWw", "UCiEHVhv0SBMpP75JbzJShqw", "UCngehmCV-65FikHYUV1_qXA",
    "UCMWg8e_4hC6p5abek1VGuMw", "UCIuFVDoogw9ujgLbpTCM3sQ", "UCL9No2CVecC_8WazyduwHaw",
    "UCCabJxhy6wokraEGgFcYD5g", "UCC4FftDQK5gj4Ru2MgvraTw", "UCshPTHWDVDFPT3J-V2xBGRA",
    "UCxjYJHqLxAyMI0jHEbUnNtg", "UC3g-w83Cb5pEAu5UmRrge-A",
];

/// Discovery seed built from [`KNOWN_CHANNEL_IDS`].
pub fn known_seed() -> ChannelIdSet {
    KNOWN_CHANNEL_IDS.iter().copied().collect()
}

/// Channels split into the curated group and everything else.
///
/// Both halves keep the order the channels were given in.
#[derive(Debug, Clone, Default)]
pub struct ChannelClassification {
    pub known: Vec<Channel>,
    pub other: Vec<Channel>,
}

impl ChannelClassification {
    /// Partition `channels` by membership of `known_ids`.
    pub fn classify<S: AsRef<str>>(channels: Vec<Channel>, known_ids: &[S]) -> Self {
        let known_ids: HashSet<&str> = known_ids.iter().map(|s| s.as_ref()).collect();
        let (known, other) = channels
            .into_iter()
            .partition(|c| known_ids.contains(c.id.as_str()));
        Self { known, other }
    }

    /// All channels, known first.
    pub fn ordered(&self) -> impl Iterator<Item = &Channel> {
        self.known.iter().chain(self.other.iter())
    }

    pub fn len(&self) -> usize {
        self.known.len() + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty() && self.other.is_empty()
    }
}
