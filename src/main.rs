// Entrypoint for the Moltbook CLI.
// - Keeps `main` small: build the API client, register on first run, then
//   hand the client to the menu loop.

use moltbook_cli::{api::ApiClient, logging, ui};

fn main() -> anyhow::Result<()> {
    logging::init();

    // Base URL and credential file come from `MOLTBOOK_BASE_URL` and
    // `MOLTBOOK_ENV_FILE`, defaulting to the public API and `./.env`.
    let mut api = ApiClient::from_env()?;

    if !api.has_credentials() && !ui::first_run(&mut api)? {
        return Ok(());
    }

    let name = api.identity().display_name.clone();
    ui::main_menu(&api, &name)?;
    Ok(())
}
