//! 配置管理命令

use crate::rig::GlobalArgs;
use actlab_tools::RigConfig;
use anyhow::{Result, bail};
use clap::Subcommand;

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 显示生效的配置
    Show,

    /// 写入默认配置文件
    Init {
        /// 覆盖已存在的文件
        #[arg(short, long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(self, global: &GlobalArgs) -> Result<()> {
        let path = global.config_path();

        match self {
            ConfigCommand::Show => {
                let config = RigConfig::load(&path)?;
                if path.exists() {
                    println!("# {}", path.display());
                } else {
                    println!("# {}（不存在，使用默认配置）", path.display());
                }
                print!("{}", config.to_toml()?);
                Ok(())
            },

            ConfigCommand::Init { force } => {
                if path.exists() && !force {
                    bail!("配置文件已存在: {}（使用 --force 覆盖）", path.display());
                }
                RigConfig::default().save(&path)?;
                println!("✅ 已写入默认配置: {}", path.display());
                Ok(())
            },
        }
    }
}
