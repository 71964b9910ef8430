use std::collections::{BTreeMap, HashMap};

use bladelink_frame::Event;

/// Last known parameters of each utility-mixer channel, keyed by sub-address.
///
/// The manager never keeps this itself; callers feed it events they receive.
/// Updates merge, so an event carrying only `ON` keeps earlier fader values.
#[derive(Debug, Clone, Default)]
pub struct MixerState {
    channels: HashMap<String, BTreeMap<String, String>>,
}

impl MixerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a `MixerUpdate` event. Returns `false` for any other event.
    pub fn apply(&mut self, event: &Event) -> bool {
        if !event.is_mixer_update() {
            return false;
        }
        let Some(subaddr) = event.subaddr.as_deref() else {
            return false;
        };
        let channel = self.channels.entry(subaddr.to_string()).or_default();
        for (key, value) in &event.params {
            channel.insert(key.clone(), value.clone());
        }
        true
    }

    pub fn get(&self, subaddr: &str) -> Option<&BTreeMap<String, String>> {
        self.channels.get(subaddr)
    }

    pub fn param(&self, subaddr: &str, key: &str) -> Option<&str> {
        self.channels.get(subaddr)?.get(key).map(String::as_str)
    }

    /// `true` when the channel last reported `ON:1`.
    pub fn is_on(&self, subaddr: &str) -> bool {
        self.param(subaddr, "ON") == Some("1")
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Forget everything, e.g. after a reconnect.
    pub fn clear(&mut self) {
        self.channels.clear();
    }
}

#[cfg(test)]
mod tests {
    use bladelink_frame::parse_frame;

    use super::*;

    #[test]
    fn merges_updates_per_channel() {
        let mut mixer = MixerState::new();
        assert!(mixer.apply(&parse_frame("<UMIX:1.2|ON:1,FDRA:-6.5>")));
        assert!(mixer.apply(&parse_frame("<UMIXEVENT:1.2|ON:0>")));
        assert!(mixer.apply(&parse_frame("<UMIX:1.3|ON:1>")));

        assert_eq!(mixer.len(), 2);
        assert!(!mixer.is_on("1.2"));
        assert_eq!(mixer.param("1.2", "FDRA"), Some("-6.5"));
        assert!(mixer.is_on("1.3"));
        assert_eq!(mixer.get("1.3").map(BTreeMap::len), Some(1));
    }

    #[test]
    fn ignores_other_events() {
        let mut mixer = MixerState::new();
        assert!(!mixer.apply(&parse_frame("<SYS|NAME:Blade>")));
        assert!(!mixer.apply(&parse_frame("<UMIX|ON:1>")));
        assert!(!mixer.apply(&parse_frame("<DST:00400001|SRC:00800001>")));
        assert!(mixer.is_empty());
        assert!(!mixer.is_on("1.2"));
    }

    #[test]
    fn clear_forgets_channels() {
        let mut mixer = MixerState::new();
        mixer.apply(&parse_frame("<UMIX:1.2|ON:1>"));
        mixer.clear();
        assert!(mixer.is_empty());
        assert_eq!(mixer.param("1.2", "ON"), None);
    }
}
