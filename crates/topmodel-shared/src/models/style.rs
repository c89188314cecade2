/// A built-in fashion style the user can pick instead of typing a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleOption {
    pub id: &'static str,
    /// Translation key of the display label.
    pub name: &'static str,
    pub prompt: &'static str,
}

pub static STYLE_OPTIONS: [StyleOption; 6] = [
    StyleOption {
        id: "eclectic",
        name: "style_eclectic",
        prompt: "Eclectic and extravagant high fashion style, with bold patterns and vintage accessories, in a lavish Italian villa setting.",
    },
    StyleOption {
        id: "glamour",
        name: "style_glamour",
        prompt: "Bold and glamorous high fashion style, featuring vibrant prints and gold hardware, on a luxury yacht in Miami.",
    },
    StyleOption {
        id: "classic",
        name: "style_classic",
        prompt: "Timeless and elegant haute couture, with classic silhouettes and romantic details, in a Parisian garden in full bloom.",
    },
    StyleOption {
        id: "sporty",
        name: "style_sporty",
        prompt: "Athletic and futuristic sportswear style, technical fabrics and dynamic design, in an urban concrete skatepark.",
    },
    StyleOption {
        id: "sicilian",
        name: "style_sicilian",
        prompt: "Passionate and Sicilian-inspired high fashion style, with floral prints and dramatic lace, in a vibrant street market in Sicily.",
    },
    StyleOption {
        id: "minimalist",
        name: "style_minimalist",
        prompt: "Minimalist and intellectual high fashion style, clean lines and innovative technical fabrics, in a modern art gallery with stark white walls.",
    },
];

pub fn find_style(id: &str) -> Option<&'static StyleOption> {
    STYLE_OPTIONS.iter().find(|s| s.id == id)
}

/// Short label for a style, derived from its id.
pub fn style_label(style: &StyleOption) -> String {
    let mut chars = style.id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_ids_are_unique() {
        for (i, a) in STYLE_OPTIONS.iter().enumerate() {
            for b in &STYLE_OPTIONS[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn finds_style_by_id() {
        assert!(find_style("classic").unwrap().prompt.contains("Parisian"));
        assert!(find_style("grunge").is_none());
    }

    #[test]
    fn label_capitalizes_id() {
        assert_eq!(style_label(&STYLE_OPTIONS[0]), "Eclectic");
    }
}
