use truenas_signal_client::ServerDescriptor;

pub const NO_CONNECTION: &str = "No Connection";
pub const NOT_CONFIGURED: &str = "Unknown (API Not Configured)";

/// `SHUTTING_DOWN` -> `Shutting Down`.
pub fn display_state(state: &str) -> String {
    state
        .to_lowercase()
        .replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn server_row(server: &ServerDescriptor) -> String {
    format!(
        "{:>4}  {:<24} {:<9} api={:<3} wol={}",
        server.id,
        server.name,
        server.transport.to_string(),
        yes_no(server.is_api_configured()),
        yes_no(server.is_wake_configured()),
    )
}

fn yes_no(v: bool) -> &'static str {
    if v {
        "yes"
    } else {
        "no"
    }
}
