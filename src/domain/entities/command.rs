use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::{Event, User};
use crate::application::bot::Bot;
use crate::application::errors::{CommandError, ShellError};

/// Channel modes in which a command can be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Direct,
    Group,
    Both,
}

impl Visibility {
    pub fn allows(&self, is_direct: bool) -> bool {
        match self {
            Visibility::Direct => is_direct,
            Visibility::Group => !is_direct,
            Visibility::Both => true,
        }
    }
}

/// Everything a command receives for one invocation
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Text typed after the keyword, verbatim
    pub arguments: String,
    pub attachment: Option<String>,
    pub url: Option<String>,
    pub actor: Option<User>,
}

impl Request {
    pub fn new(arguments: impl Into<String>) -> Self {
        Self {
            arguments: arguments.into(),
            ..Default::default()
        }
    }

    pub fn from_event(arguments: impl Into<String>, event: &Event) -> Self {
        Self {
            arguments: arguments.into(),
            attachment: event.attachment.clone(),
            url: event.url.clone(),
            actor: event.actor.clone(),
        }
    }
}

/// A unit of behavior bound to a keyword
///
/// Commands are built once at startup and registered into a
/// [`CommandRegistry`]. Interactive commands run on the dispatch path,
/// the others are queued on the channel pipeline.
#[async_trait]
pub trait Command: Send + Sync {
    fn keyword(&self) -> &str;

    fn information_message(&self) -> &str;

    fn usage_message(&self) -> Option<&str> {
        None
    }

    fn is_interactive(&self) -> bool {
        true
    }

    fn visibility(&self) -> Visibility {
        Visibility::Both
    }

    /// Hidden commands can be dispatched but are not listed by help
    fn is_hidden(&self) -> bool {
        false
    }

    async fn execute(&self, bot: &Bot, request: &Request) -> Result<(), CommandError>;
}

/// Command registry, read-only once the engine is built
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<C: Command + 'static>(&mut self, command: C) -> Result<(), ShellError> {
        self.register_arc(Arc::new(command))
    }

    pub fn register_arc(&mut self, command: Arc<dyn Command>) -> Result<(), ShellError> {
        let keyword = command.keyword().to_lowercase();
        if keyword.is_empty() || keyword.contains(char::is_whitespace) {
            return Err(ShellError::InvalidKeyword(keyword));
        }
        if self.commands.contains_key(&keyword) {
            return Err(ShellError::DuplicateKeyword(keyword));
        }
        tracing::debug!(keyword = %keyword, "Registering command");
        self.commands.insert(keyword, command);
        Ok(())
    }

    pub fn get(&self, keyword: &str) -> Option<&Arc<dyn Command>> {
        self.commands.get(&keyword.to_lowercase())
    }

    /// Looks up a command usable in the given channel mode
    pub fn find(&self, keyword: &str, is_direct: bool) -> Result<&Arc<dyn Command>, ShellError> {
        self.get(keyword)
            .filter(|c| c.visibility().allows(is_direct))
            .ok_or_else(|| ShellError::UnknownCommand(keyword.to_string()))
    }

    /// Commands listed by help for the given channel mode, sorted by keyword
    pub fn listed(&self, is_direct: bool) -> impl Iterator<Item = &Arc<dyn Command>> {
        self.commands
            .values()
            .filter(move |c| !c.is_hidden() && c.visibility().allows(is_direct))
    }

    pub fn keywords(&self) -> Vec<&str> {
        self.commands.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub {
        keyword: &'static str,
        visibility: Visibility,
        hidden: bool,
    }

    #[async_trait]
    impl Command for Stub {
        fn keyword(&self) -> &str {
            self.keyword
        }

        fn information_message(&self) -> &str {
            "stub"
        }

        fn visibility(&self) -> Visibility {
            self.visibility
        }

        fn is_hidden(&self) -> bool {
            self.hidden
        }

        async fn execute(&self, _bot: &Bot, _request: &Request) -> Result<(), CommandError> {
            Ok(())
        }
    }

    fn stub(keyword: &'static str, visibility: Visibility) -> Stub {
        Stub { keyword, visibility, hidden: false }
    }

    #[test]
    fn duplicate_keyword_is_rejected() {
        let mut registry = CommandRegistry::new();
        registry.register(stub("hello", Visibility::Both)).unwrap();

        let err = registry.register(stub("HELLO", Visibility::Group)).unwrap_err();
        assert_eq!(err, ShellError::DuplicateKeyword("hello".to_string()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn keyword_with_spaces_is_rejected() {
        let mut registry = CommandRegistry::new();
        let err = registry.register(stub("two words", Visibility::Both)).unwrap_err();
        assert!(matches!(err, ShellError::InvalidKeyword(_)));
    }

    #[test]
    fn find_honours_visibility() {
        let mut registry = CommandRegistry::new();
        registry.register(stub("suicide", Visibility::Group)).unwrap();
        registry.register(stub("start", Visibility::Direct)).unwrap();

        assert!(registry.find("suicide", false).is_ok());
        assert!(matches!(
            registry.find("suicide", true),
            Err(ShellError::UnknownCommand(_))
        ));
        assert!(registry.find("start", true).is_ok());
        assert!(registry.find("start", false).is_err());
    }

    #[test]
    fn listing_skips_hidden_and_invisible() {
        let mut registry = CommandRegistry::new();
        registry.register(stub("zeta", Visibility::Both)).unwrap();
        registry.register(stub("alpha", Visibility::Both)).unwrap();
        registry.register(stub("group", Visibility::Group)).unwrap();
        registry
            .register(Stub { keyword: "*upload", visibility: Visibility::Both, hidden: true })
            .unwrap();

        let direct: Vec<&str> = registry.listed(true).map(|c| c.keyword()).collect();
        assert_eq!(direct, vec!["alpha", "zeta"]);

        let group: Vec<&str> = registry.listed(false).map(|c| c.keyword()).collect();
        assert_eq!(group, vec!["alpha", "group", "zeta"]);
    }
}
