//! `linkclean toggle <current> <original> <param>` – keep or drop one parameter.

use anyhow::Result;
use linkclean_core::message::toggle_param;

pub fn run_toggle(current: &str, original: &str, param: &str) -> Result<()> {
    println!("{}", toggle_param(current, original, param)?);
    Ok(())
}
