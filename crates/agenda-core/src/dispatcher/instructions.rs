//! Run instructions

use chrono::NaiveDateTime;

/// Instructions attached to every run, stamped with the current local time
///
/// Keeps the assistant on scheduling topics and only fills attendees from
/// explicitly written e-mail addresses.
pub fn run_instructions(now: NaiveDateTime) -> String {
    format!(
        "Seja atencioso e respeitoso, se atente a agendar reuniões e coletar informações de \
         reuniões futuras, sua função é também montar as funções que permitam chamar as funções \
         e não falar sobre tópico algum que não seja relacionado a eventos. Horário e dia atual: \
         {}. Somente coloque atendees caso tenha um email explicitamente escrito no texto, se \
         não, coloque na descrição e no titulo.",
        now.format("%H:%M:%S %d/%m/%Y")
    )
}
