//! Greeting rendering strategies, one per formality level.

use crate::request::Formality;

/// Edition label attached to every rendered greeting.
pub const ENTERPRISE_EDITION: &str = "Hello World (Enterprise Edition)";

pub trait GreetingStrategy: Send + Sync {
    fn formality(&self) -> Formality;
    fn render(&self, recipient: &str) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CasualGreeting;

impl GreetingStrategy for CasualGreeting {
    fn formality(&self) -> Formality {
        Formality::Casual
    }

    fn render(&self, recipient: &str) -> String {
        format!("Hello {recipient}")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProfessionalGreeting;

impl GreetingStrategy for ProfessionalGreeting {
    fn formality(&self) -> Formality {
        Formality::Professional
    }

    fn render(&self, recipient: &str) -> String {
        format!("Hello, {recipient}")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FormalGreeting;

impl GreetingStrategy for FormalGreeting {
    fn formality(&self) -> Formality {
        Formality::Formal
    }

    fn render(&self, recipient: &str) -> String {
        format!("Greetings, {recipient}")
    }
}

/// Resolves the strategy for a formality level.
pub fn strategy_for(formality: Formality) -> &'static dyn GreetingStrategy {
    match formality {
        Formality::Casual => &CasualGreeting,
        Formality::Professional => &ProfessionalGreeting,
        Formality::Formal => &FormalGreeting,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_each_formality() {
        assert_eq!(strategy_for(Formality::Casual).render("World"), "Hello World");
        assert_eq!(
            strategy_for(Formality::Professional).render("World"),
            "Hello, World"
        );
        assert_eq!(
            strategy_for(Formality::Formal).render("World"),
            "Greetings, World"
        );
    }

    #[test]
    fn resolved_strategy_matches_formality() {
        for formality in [Formality::Casual, Formality::Professional, Formality::Formal] {
            assert_eq!(strategy_for(formality).formality(), formality);
        }
    }
}
