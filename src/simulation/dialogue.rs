use thiserror::Error;

use crate::simulation::npc::Npc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueTurn {
    pub speaker: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("dialogue service unavailable: {0}")]
    Unavailable(String),
    #[error("dialogue service returned nothing")]
    Empty,
}

/// Text generation for NPC flavor dialogue. Implementations never see or
/// touch game state.
pub trait DialogueService {
    fn respond(
        &mut self,
        npc: &Npc,
        utterance: &str,
        history: &[DialogueTurn],
    ) -> Result<String, DialogueError>;
}

/// Cycles through each NPC's canned lines.
#[derive(Debug, Default)]
pub struct ScriptedDialogue;

impl DialogueService for ScriptedDialogue {
    fn respond(
        &mut self,
        npc: &Npc,
        _utterance: &str,
        history: &[DialogueTurn],
    ) -> Result<String, DialogueError> {
        let lines = npc.lines();
        if lines.is_empty() {
            return Err(DialogueError::Empty);
        }
        let spoken = history.iter().filter(|turn| turn.speaker == npc.name).count();
        Ok(lines[spoken % lines.len()].to_string())
    }
}

/// Ask the service for a reply and record both sides in `history`.
/// Failures degrade to a neutral line.
pub fn converse(
    service: &mut dyn DialogueService,
    npc: &Npc,
    utterance: &str,
    history: &mut Vec<DialogueTurn>,
) -> String {
    let reply = match service.respond(npc, utterance, history) {
        Ok(reply) if !reply.trim().is_empty() => reply,
        Ok(_) => fallback_line(npc, &DialogueError::Empty),
        Err(err) => fallback_line(npc, &err),
    };
    history.push(DialogueTurn {
        speaker: "you".to_string(),
        text: utterance.to_string(),
    });
    history.push(DialogueTurn {
        speaker: npc.name.clone(),
        text: reply.clone(),
    });
    reply
}

fn fallback_line(npc: &Npc, err: &DialogueError) -> String {
    tracing::warn!(target: "sect::dialogue", npc = %npc.name, error = %err, "dialogue.fallback");
    format!("{} nods quietly, lost in thought.", npc.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::npc::{NpcRole, NpcRoster};

    struct Offline;

    impl DialogueService for Offline {
        fn respond(
            &mut self,
            _npc: &Npc,
            _utterance: &str,
            _history: &[DialogueTurn],
        ) -> Result<String, DialogueError> {
            Err(DialogueError::Unavailable("timeout".to_string()))
        }
    }

    #[test]
    fn scripted_lines_rotate_with_history() {
        let roster = NpcRoster::default();
        let master = roster.get(NpcRole::Master).unwrap();
        let mut history = Vec::new();
        let mut service = ScriptedDialogue;
        let first = converse(&mut service, master, "hello", &mut history);
        let second = converse(&mut service, master, "again", &mut history);
        assert_eq!(first, master.lines()[0]);
        assert_eq!(second, master.lines()[1]);
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn failing_service_falls_back() {
        let roster = NpcRoster::default();
        let friend = roster.get(NpcRole::Friend).unwrap();
        let mut history = Vec::new();
        let reply = converse(&mut Offline, friend, "hi", &mut history);
        assert!(reply.contains(&friend.name));
        assert_eq!(history.len(), 2);
    }
}
