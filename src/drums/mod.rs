// Drum Voice Mapper - Lane to voice classification
// Pure table lookups over pluggable lane maps

pub mod voices;

pub use voices::{
    count_voices, group_by_voice, map_lane_to_voice, map_note_to_voice, DrumVoice, LaneMap,
    LaneRule, VoiceCounts,
};
