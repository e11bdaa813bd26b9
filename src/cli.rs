use clap::Parser;
use std::path::PathBuf;

/// aria2 下载引擎守护进程
#[derive(Parser, Debug)]
#[command(name = "maltexd")]
#[command(version = "0.1")]
#[command(author = "rpeng252@gmail.com")]
#[command(about = "托管 aria2 引擎并同步下载任务", long_about = None)]
pub struct Cli {
    /// 启动后添加的任务：链接、磁力链接、种子文件路径或 maltex:// 链接
    #[arg(value_name = "INPUT")]
    pub inputs: Vec<String>,

    /// 数据目录 (历史记录、会话、日志)
    #[arg(long, value_name = "DIR")]
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub data_dir: Option<PathBuf>,

    /// 设置文件，默认为数据目录下的 settings.json
    #[arg(long, value_name = "FILE")]
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// 覆盖设置中的 RPC 端口
    #[arg(long, value_name = "PORT")]
    pub rpc_port: Option<u16>,

    /// 覆盖设置中的 RPC 密钥
    #[arg(long, value_name = "SECRET")]
    pub rpc_secret: Option<String>,

    /// 设置文件无法解析时直接退出，而不是使用默认设置
    #[arg(long)]
    pub strict_config: bool,

    /// 把当前生效的设置写入设置文件后退出
    #[arg(long)]
    pub init_config: bool,

    /// 不启动引擎，连接已经在运行的 aria2
    #[arg(long)]
    pub no_engine: bool,

    /// 输出调试日志
    #[arg(short, long)]
    pub verbose: bool,
}
