//! rekey サブコマンド
//!
//! 旧形式（キーなしのリスト）または既存のインベントリを読み込み、
//! 識別キー付きの形式で書き出します。アドレスはマスクされます。

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::error::CensusResult;
use crate::inventory::persist::{read_inventory, save_inventory};

/// rekey サブコマンドの引数
#[derive(Args, Debug, Clone)]
pub struct RekeyArgs {
    /// Inventory file to convert
    #[arg(short, long)]
    pub input: PathBuf,

    /// Destination (default: overwrite the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the rekey command, returning the number of records written
pub async fn execute(args: &RekeyArgs) -> CensusResult<usize> {
    let inventory = read_inventory(&args.input).await?;
    let output = args.output.as_ref().unwrap_or(&args.input);
    save_inventory(output, &inventory).await?;
    info!(
        input = %args.input.display(),
        output = %output.display(),
        records = inventory.len(),
        "Rewrote inventory with identity keys"
    );
    Ok(inventory.len())
}
