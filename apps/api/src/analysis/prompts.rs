// Prompts for résumé-based career analysis.

/// System prompt for career-path analysis.
pub const CAREER_ANALYSIS_SYSTEM: &str = "You are an experienced career advisor. \
    You help people discover realistic career paths based on the skills, \
    experience and education shown in their résumé. \
    Ground every suggestion in evidence from the résumé. \
    Do NOT invent qualifications the person does not have. \
    Be encouraging but honest about gaps.";

pub const CAREER_ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze the résumé below and suggest career paths that fit this person.

RÉSUMÉ:
{resume_text}

Respond in Markdown with these sections:
1. **Profile summary**: two or three sentences on the person's background and strongest skills.
2. **Suggested career paths**: three to five roles. For each give the role title, why it fits (cite résumé evidence), and the typical next step to get there.
3. **Skill gaps**: the most valuable skills to develop, ordered by impact.
4. **Next actions**: three concrete things to do in the next month.
"#;
