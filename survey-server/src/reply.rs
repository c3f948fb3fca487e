//! Assistant reply text.
//!
//! Turns `ReplyContent` into the markdown shown in the chat, in English or
//! Brazilian Portuguese.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::state_machine::effect::ReplyContent;
use crate::state_machine::state::FeedbackDraft;

/// Language of the assistant's replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "pt-BR")]
    Portuguese,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "en-us" | "en-gb" | "english" => Ok(Locale::English),
            "pt" | "pt-br" | "portuguese" => Ok(Locale::Portuguese),
            other => Err(format!(
                "unsupported locale '{}' (expected 'en' or 'pt-BR')",
                other
            )),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::English => write!(f, "en"),
            Locale::Portuguese => write!(f, "pt-BR"),
        }
    }
}

/// Render a reply in the given locale.
pub fn render(content: &ReplyContent, locale: Locale) -> String {
    match locale {
        Locale::English => render_english(content),
        Locale::Portuguese => render_portuguese(content),
    }
}

fn render_english(content: &ReplyContent) -> String {
    match content {
        ReplyContent::Greeting => "Hello! Your opinion matters a lot to us. We'd like to invite you \
             to answer our satisfaction survey. It only takes a few minutes and helps us improve \
             our services and products. Say anything to begin!"
            .to_string(),
        ReplyContent::AskName => "Great! To start, what is your name?".to_string(),
        ReplyContent::AskEmail { name } => format!(
            "Nice to meet you, {}! 😊 Now, please tell me your best email address.",
            name
        ),
        ReplyContent::InvalidEmail => {
            "❌ That email doesn't look valid. Could you try again, please?".to_string()
        }
        ReplyContent::AskRating => "Thank you! On a scale from 0 (terrible) to 10 (excellent), \
             how satisfied are you with our services overall?"
            .to_string(),
        ReplyContent::RatingOutOfRange => "Please enter a whole number between 0 and 10.".to_string(),
        ReplyContent::RatingNotANumber => {
            "❌ Oops, that doesn't look like a number. Please type a value from 0 to 10.".to_string()
        }
        ReplyContent::AskComment => "Got it. Would you like to leave any additional comment or \
             suggestion? (If not, just say 'no')"
            .to_string(),
        ReplyContent::ConfirmSummary { draft } => summary(
            draft,
            SummaryLabels {
                intro: "Alright, let's confirm your answers:",
                name: "Name",
                email: "Email",
                rating: "Rating",
                comment: "Comment",
                no_comment: "No comment.",
                question: "May I record this information? (Yes/No)",
            },
        ),
        ReplyContent::Saved => {
            "Done! Your answers were saved successfully. Thank you so much for your help! ✨"
                .to_string()
        }
        ReplyContent::SaveFailed => {
            "There was a problem saving your answers. Please try again later.".to_string()
        }
        ReplyContent::Cancelled => {
            "No problem. If you like, we can start over. Just say 'hi' or restart the chat."
                .to_string()
        }
        ReplyContent::Closed => {
            "The survey is finished. If you need anything else, I'm here to help!".to_string()
        }
    }
}

fn render_portuguese(content: &ReplyContent) -> String {
    match content {
        ReplyContent::Greeting => "Olá! A sua opinião é muito importante para nós. Gostaríamos de \
             convidá-lo(a) a responder à nossa pesquisa de satisfação. Levará apenas alguns \
             minutos do seu tempo e nos ajudará a aprimorar nossos serviços e produtos para \
             oferecer uma experiência ainda melhor. Sua participação é fundamental para que \
             possamos entender suas necessidades e expectativas. Contamos com você!"
            .to_string(),
        ReplyContent::AskName => "Ótimo! Para começar, qual é o seu nome?".to_string(),
        ReplyContent::AskEmail { name } => format!(
            "Prazer, {}! 😊 Agora, por favor, me informe o seu melhor e-mail.",
            name
        ),
        ReplyContent::InvalidEmail => {
            "❌ Parece que este e-mail não é válido. Poderia tentar novamente, por favor?"
                .to_string()
        }
        ReplyContent::AskRating => "Obrigado! Em uma escala de 0 (péssima) a 10 (excelente), \
             qual a sua satisfação geral com nossos serviços?"
            .to_string(),
        ReplyContent::RatingOutOfRange => {
            "Por favor, insira um número inteiro entre 0 e 10.".to_string()
        }
        ReplyContent::RatingNotANumber => {
            "❌ Ops, isso não parece ser um número. Por favor, digite um valor de 0 a 10."
                .to_string()
        }
        ReplyContent::AskComment => "Entendido. Você gostaria de deixar algum comentário ou \
             sugestão adicional? (Se não, pode apenas dizer 'não')"
            .to_string(),
        ReplyContent::ConfirmSummary { draft } => summary(
            draft,
            SummaryLabels {
                intro: "Certo, vamos confirmar suas respostas:",
                name: "Nome",
                email: "Email",
                rating: "Nota",
                comment: "Comentário",
                no_comment: "Nenhum comentário.",
                question: "Posso registrar essas informações? (Sim/Não)",
            },
        ),
        ReplyContent::Saved => "Pronto! Suas respostas foram salvas com sucesso. Agradecemos \
             muito sua colaboração! ✨"
            .to_string(),
        ReplyContent::SaveFailed => "Houve um problema ao salvar suas respostas. Por favor, \
             tente novamente mais tarde."
            .to_string(),
        ReplyContent::Cancelled => "Tudo bem. Se quiser, podemos recomeçar. Basta me dizer \
             'olá' ou recarregar a página."
            .to_string(),
        ReplyContent::Closed => {
            "A pesquisa foi finalizada. Se precisar de algo mais, estou à disposição!".to_string()
        }
    }
}

struct SummaryLabels {
    intro: &'static str,
    name: &'static str,
    email: &'static str,
    rating: &'static str,
    comment: &'static str,
    no_comment: &'static str,
    question: &'static str,
}

fn summary(draft: &FeedbackDraft, labels: SummaryLabels) -> String {
    let comment = if draft.comment.is_empty() {
        labels.no_comment
    } else {
        draft.comment.as_str()
    };

    format!(
        "{}\n- **{}:** {}\n- **{}:** {}\n- **{}:** {}\n- **{}:** {}\n\n{}",
        labels.intro,
        labels.name,
        draft.name,
        labels.email,
        draft.email,
        labels.rating,
        draft.rating,
        labels.comment,
        comment,
        labels.question
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{parse_rating, Email};

    fn draft(comment: &str) -> FeedbackDraft {
        FeedbackDraft {
            name: "Ana".to_string(),
            email: Email::parse("ana@x.com").unwrap(),
            rating: parse_rating("9").unwrap(),
            comment: comment.to_string(),
        }
    }

    #[test]
    fn test_locale_parsing() {
        assert_eq!("en".parse::<Locale>(), Ok(Locale::English));
        assert_eq!("pt-BR".parse::<Locale>(), Ok(Locale::Portuguese));
        assert_eq!(" PT-br ".parse::<Locale>(), Ok(Locale::Portuguese));
        assert!("fr".parse::<Locale>().is_err());
        assert_eq!(Locale::Portuguese.to_string(), "pt-BR");
    }

    #[test]
    fn test_summary_lists_every_answer() {
        let text = render(
            &ReplyContent::ConfirmSummary {
                draft: draft("great service"),
            },
            Locale::English,
        );
        assert_eq!(
            text,
            "Alright, let's confirm your answers:\n\
             - **Name:** Ana\n\
             - **Email:** ana@x.com\n\
             - **Rating:** 9\n\
             - **Comment:** great service\n\
             \n\
             May I record this information? (Yes/No)"
        );
    }

    #[test]
    fn test_summary_without_comment() {
        let text = render(
            &ReplyContent::ConfirmSummary { draft: draft("") },
            Locale::Portuguese,
        );
        assert!(text.contains("- **Comentário:** Nenhum comentário."));
        assert!(text.ends_with("Posso registrar essas informações? (Sim/Não)"));
    }

    #[test]
    fn test_name_is_echoed() {
        let content = ReplyContent::AskEmail {
            name: "Ana".to_string(),
        };
        assert!(render(&content, Locale::English).starts_with("Nice to meet you, Ana!"));
        assert!(render(&content, Locale::Portuguese).starts_with("Prazer, Ana!"));
    }
}
