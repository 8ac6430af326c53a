use lockfish::{
    config::Protocol,
    nfs3::{FileType3, PostOpAttributes},
    ClientConfig, LockOptions, Session,
};

use argh::FromArgs;
use bytes::Bytes;
use std::error::Error;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Test NFSv3 and NLM client
struct Command {
    /// host name or IP address
    #[argh(option)]
    host: String,

    /// export to mount, default is /
    #[argh(option, short = 'e', default = "String::from(\"/\")")]
    export: String,

    /// use UDP instead of TCP
    #[argh(switch, short = 'u')]
    udp: bool,

    /// bind local sockets to a reserved port (needs privileges)
    #[argh(switch, short = 'r')]
    reserved_port: bool,

    #[argh(subcommand)]
    cmd: Commands,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
enum Commands {
    Lookup(Lookup),
    Create(Create),
    Write(Write),
    Lock(Lock),
    Unlock(Unlock),
    ReadDir(ReadDir),
    ReadDirPlus(ReadDirPlus),
}

/// Lookup a file in the export root and print the resulting FH
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "lookup")]
struct Lookup {
    #[argh(positional)]
    name: String,
}

/// Create a file in the export root
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "create")]
struct Create {
    #[argh(positional)]
    name: String,
}

/// Write text to a file, creating it if needed
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "write")]
struct Write {
    #[argh(positional)]
    name: String,

    #[argh(positional)]
    text: String,

    /// byte offset, default is 0
    #[argh(option, short = 'o', default = "0")]
    offset: u64,
}

/// Lock a whole file
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "lock")]
struct Lock {
    #[argh(positional)]
    name: String,

    /// lock owner, default is the process id
    #[argh(option)]
    owner: Option<String>,

    /// name presented to the lock manager, default is this host
    #[argh(option)]
    caller: Option<String>,

    /// take a shared lock
    #[argh(switch)]
    shared: bool,

    /// ask the server to block until the lock is available
    #[argh(switch)]
    block: bool,
}

/// Unlock a whole file
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "unlock")]
struct Unlock {
    #[argh(positional)]
    name: String,

    /// lock owner, default is the process id
    #[argh(option)]
    owner: Option<String>,

    /// name presented to the lock manager, default is this host
    #[argh(option)]
    caller: Option<String>,
}

/// List the export root
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "ls")]
struct ReadDir {}

/// List the export root with attributes
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "ls-plus")]
struct ReadDirPlus {}

fn owner(owner: &Option<String>) -> Vec<u8> {
    match owner {
        Some(owner) => owner.as_bytes().to_vec(),
        None => std::process::id().to_string().into_bytes(),
    }
}

fn ls_print_entry(name: &str, attributes: &PostOpAttributes) {
    let Some(attrs) = attributes else {
        println!("?????????? {}", name);
        return;
    };

    let c1 = match attrs.file_type {
        FileType3::Reg => '_',
        FileType3::Dir => 'd',
        FileType3::Blk => 'b',
        FileType3::Chr => 'c',
        FileType3::Lnk => 'l',
        FileType3::Sock => 's',
        FileType3::Fifo => 'p',
    };
    let perms: String = (0..9)
        .rev()
        .map(|bit| {
            if attrs.mode & (1 << bit) == 0 {
                '-'
            } else {
                ['x', 'w', 'r'][bit % 3]
            }
        })
        .collect();

    println!("{}{} {:>10} {}", c1, perms, attrs.size, name);
}

async fn run(cmd: Command) -> lockfish::Result<()> {
    let mut config = ClientConfig::new(cmd.host);
    if cmd.udp {
        config.protocol = Protocol::Udp;
    }
    config.use_reserved_port = cmd.reserved_port;

    let mut session = Session::open(config, &cmd.export).await?;
    println!("mounted {}, root fh {:?}", cmd.export, session.root());

    match &cmd.cmd {
        Commands::Lookup(lookup) => match session.lookup_file(&lookup.name).await? {
            Some(fh) => println!("got fh {:?}", fh),
            None => println!("{} not found", lookup.name),
        },
        Commands::Create(create) => {
            let fh = session.create_file(&create.name).await?;
            println!("created {:?}", fh);
        }
        Commands::Write(write) => {
            let data = Bytes::from(write.text.clone().into_bytes());
            let res = session.write_file(&write.name, write.offset, data).await?;
            println!("wrote {} bytes ({:?})", res.count, res.committed);
        }
        Commands::Lock(lock) => {
            let options = LockOptions {
                exclusive: !lock.shared,
                block: lock.block,
                caller_name: lock.caller.clone(),
                ..Default::default()
            };
            let stat = session
                .lock_file(&lock.name, &owner(&lock.owner), &options)
                .await?;
            println!("lock: {:?}", stat);
        }
        Commands::Unlock(unlock) => {
            let options = LockOptions {
                caller_name: unlock.caller.clone(),
                ..Default::default()
            };
            let stat = session
                .unlock_file(&unlock.name, &owner(&unlock.owner), &options)
                .await?;
            println!("unlock: {:?}", stat);
        }
        Commands::ReadDir(_) => {
            for entry in session.list().await? {
                println!("{:>10} {}", entry.fileid, entry.name);
            }
        }
        Commands::ReadDirPlus(_) => {
            for entry in session.list_plus().await? {
                ls_print_entry(&entry.name, &entry.name_attributes);
            }
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cmd: Command = argh::from_env();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cmd))?;

    Ok(())
}
