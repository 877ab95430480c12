//! Prompt templates for the responder node.
//!
//! Placeholders use `{{name}}` and are filled by plain substitution.

use crate::models::ChatMessage;
use crate::services::clock::TimeInfo;

pub const EMPTY_HISTORY: &str = "No hay historial previo.";
pub const SOURCES_HEADER: &str = "Fuentes:";

const CONTEXT_TEMPLATE: &str = r###"Eres {{agent_name}}, una asistente virtual con expertiz en temas previsionales.

Información temporal actual:
- Fecha: {{date}}
- Hora: {{time}}
- Zona horaria: {{timezone}}

Contexto relevante:
{{context}}

Historial de la conversación:
{{chat_history}}

Pregunta actual: {{question}}

Referencias disponibles:
{{sources}}

Instrucciones especiales:
    - No debes inventar información, solo debes usar el contexto y las referencias.
    - No debes realizar calculos financieros, solo debes dar una explicacion general.
    - Si el usuario te pide un calculo de pension indica que puede ocupar la calculadora de pensiones y presionando recalcular puede volver a calcular.

Instrucciones de formato y estilo:
    1. Extensión
    - Máximo 250 palabras
    - Oraciones cortas y directas

    2. Estructura
    - Introducción breve (2-3 líneas)
    - 1 a 3 subtítulos con "##"
    - Puntos clave con "-"
    - Conclusión breve (opcional)

    3. Formato
    - **Negrita** para conceptos clave
    - *Cursiva* para términos importantes
    - > para una cita (máx. 1)
    - Una línea en blanco entre secciones

    4. Fuentes
    - Una línea en blanco antes de "Fuentes:"
    - Lista solo las fuentes realmente usadas

Ejemplo de respuesta ideal:

    Introducción breve que presenta el tema principal.

    ## Aspectos Clave

    - **Primer punto**: explicación concisa
    - **Segundo punto**: explicación concisa
    - **Tercer punto**: explicación concisa

    > Cita relevante (si es necesaria)

    Fuentes:
    {{sources}}
"###;

const SIMPLE_TEMPLATE: &str = r#"Eres un asistente experto en temas previsionales.
Tu genero esta determinado por tu nombre {{agent_name}}.

Información temporal actual:
- Fecha: {{date}}
- Hora: {{time}}
- Zona horaria: {{timezone}}

Historial de la conversación:
{{chat_history}}

Instrucciones especiales:
- No debes responder preguntas que no estén relacionadas con los temas previsionales.
- No puedes realizar asesoria financiera especifica, si el usuario te lo solicita, da consejos generales relacionados con el tema previsional.
- No debes realizar calculos financieros, solo debes dar una explicacion general.
- Si el usuario te pide un calculo de pension indica que puede ocupar nuestra calculadora de pensiones disponible en la pagina principal, presionando recalcular puede volver a ingresar los datos. No debes dar mas explicaciones.

Responde de manera cordial y concisa al siguiente mensaje: {{question}}
"#;

/// Values substituted into either template
pub struct PromptVars<'a> {
    pub agent_name: &'a str,
    pub time: &'a TimeInfo,
    pub chat_history: &'a str,
    pub question: &'a str,
}

/// Prompt used when retrieval produced context and sources
pub fn render_context_prompt(vars: &PromptVars<'_>, context: &str, sources: &str) -> String {
    let mut values: Vec<(&str, &str)> = vars.values();
    values.push(("context", context));
    values.push(("sources", sources));
    render(CONTEXT_TEMPLATE, &values)
}

/// Prompt used for everything else
pub fn render_simple_prompt(vars: &PromptVars<'_>) -> String {
    render(SIMPLE_TEMPLATE, &vars.values())
}

impl<'a> PromptVars<'a> {
    fn values(&self) -> Vec<(&'static str, &'a str)> {
        let time: &'a TimeInfo = self.time;
        vec![
            ("agent_name", self.agent_name),
            ("date", time.formatted_date.as_str()),
            ("time", time.current_time.as_str()),
            ("timezone", time.timezone.as_str()),
            ("chat_history", self.chat_history),
            ("question", self.question),
        ]
    }
}

// Single pass: substituted text is never scanned again, unknown keys stay literal.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let key = &after[..end];
        match values.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => out.push_str(value),
            None => {
                out.push_str("{{");
                out.push_str(key);
                out.push_str("}}");
            }
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

/// Append the sources block when the model left it out
pub fn ensure_sources(reply: &str, sources: &str) -> String {
    if reply.contains(SOURCES_HEADER) {
        reply.to_string()
    } else {
        format!("{}\n\n{}\n{}", reply.trim(), SOURCES_HEADER, sources)
    }
}

/// Render stored history for the prompt, one line per message
pub fn render_history(messages: &[ChatMessage]) -> String {
    if messages.is_empty() {
        return EMPTY_HISTORY.to_string();
    }

    messages
        .iter()
        .map(|msg| {
            let speaker = if msg.is_user() { "Usuario" } else { "Asistente" };
            format!("{}: {}", speaker, msg.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
