//! Command handler for RESP server

use crate::resp::RespValue;
use lrucache::LruCache;
use std::sync::Arc;

/// Cache shape served by the daemon: raw bytes in, raw bytes out
pub type ByteCache = LruCache<Vec<u8>, Vec<u8>>;

pub struct CommandHandler {
    cache: Arc<ByteCache>,
}

fn wrong_arity(command: &str) -> RespValue {
    RespValue::error(format!(
        "ERR wrong number of arguments for '{}' command",
        command
    ))
}

/// Collect every argument as a bulk string, or fail on the first that isn't
fn bulk_args(args: &[RespValue]) -> Option<Vec<&[u8]>> {
    args.iter().map(RespValue::as_bytes).collect()
}

impl CommandHandler {
    pub fn new(cache: Arc<ByteCache>) -> Self {
        Self { cache }
    }

    pub fn handle(&self, cmd: RespValue) -> RespValue {
        let items = match cmd {
            RespValue::Array(Some(items)) if !items.is_empty() => items,
            _ => return RespValue::error("ERR invalid command format"),
        };

        let command = match items[0].as_bytes() {
            Some(name) => String::from_utf8_lossy(name).to_ascii_lowercase(),
            None => return RespValue::error("ERR invalid command"),
        };

        let args = match bulk_args(&items[1..]) {
            Some(args) => args,
            None => return RespValue::error("ERR arguments must be bulk strings"),
        };

        match command.as_str() {
            "ping" => self.handle_ping(&args),
            "echo" => self.handle_echo(&args),
            "get" => self.handle_get(&args),
            "set" => self.handle_set(&args),
            "del" => self.handle_del(&args),
            "exists" => self.handle_exists(&args),
            "keys" => self.handle_keys(&args),
            "dbsize" => RespValue::Integer(self.cache.len() as i64),
            "flushdb" => self.handle_flushdb(),
            "info" => self.handle_info(),
            // redis-cli sends this on connect
            "command" => RespValue::Array(Some(vec![])),
            _ => RespValue::error(format!("ERR unknown command '{}'", command)),
        }
    }

    fn handle_ping(&self, args: &[&[u8]]) -> RespValue {
        match args {
            [] => RespValue::SimpleString("PONG".to_string()),
            [message] => RespValue::bulk(*message),
            _ => wrong_arity("ping"),
        }
    }

    fn handle_echo(&self, args: &[&[u8]]) -> RespValue {
        match args {
            [message] => RespValue::bulk(*message),
            _ => wrong_arity("echo"),
        }
    }

    fn handle_get(&self, args: &[&[u8]]) -> RespValue {
        match args {
            [key] => match self.cache.get(*key) {
                Some(value) => RespValue::bulk(value),
                None => RespValue::null(),
            },
            _ => wrong_arity("get"),
        }
    }

    fn handle_set(&self, args: &[&[u8]]) -> RespValue {
        match args {
            [key, value] => {
                self.cache.set(key.to_vec(), value.to_vec());
                RespValue::ok()
            }
            // SET options (EX, NX, ...) are not supported
            [_, _, ..] => RespValue::error("ERR syntax error"),
            _ => wrong_arity("set"),
        }
    }

    fn handle_del(&self, args: &[&[u8]]) -> RespValue {
        if args.is_empty() {
            return wrong_arity("del");
        }

        let removed = args
            .iter()
            .filter(|key| self.cache.remove(**key).is_some())
            .count();
        RespValue::Integer(removed as i64)
    }

    fn handle_exists(&self, args: &[&[u8]]) -> RespValue {
        if args.is_empty() {
            return wrong_arity("exists");
        }

        let present = args.iter().filter(|key| self.cache.contains(**key)).count();
        RespValue::Integer(present as i64)
    }

    fn handle_keys(&self, args: &[&[u8]]) -> RespValue {
        match args {
            [b"*"] => RespValue::Array(Some(
                self.cache.keys().into_iter().map(RespValue::bulk).collect(),
            )),
            [_] => RespValue::error("ERR only the '*' pattern is supported"),
            _ => wrong_arity("keys"),
        }
    }

    fn handle_flushdb(&self) -> RespValue {
        self.cache.clear();
        RespValue::ok()
    }

    fn handle_info(&self) -> RespValue {
        let stats = self.cache.stats().snapshot();
        let info = format!(
            "# Server\r\n\
             lrud_version:{}\r\n\
             \r\n\
             # Keyspace\r\n\
             keys:{}\r\n\
             capacity:{}\r\n\
             \r\n\
             # Stats\r\n\
             keyspace_hits:{}\r\n\
             keyspace_misses:{}\r\n\
             hit_ratio:{:.2}\r\n\
             inserts:{}\r\n\
             updates:{}\r\n\
             evicted_keys:{}\r\n\
             removed_keys:{}\r\n",
            env!("CARGO_PKG_VERSION"),
            self.cache.len(),
            self.cache.capacity(),
            stats.hits,
            stats.misses,
            stats.hit_ratio(),
            stats.inserts,
            stats.updates,
            stats.evictions,
            stats.removals,
        );
        RespValue::bulk(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(capacity: usize) -> CommandHandler {
        CommandHandler::new(Arc::new(LruCache::new(capacity)))
    }

    fn cmd(parts: &[&str]) -> RespValue {
        RespValue::Array(Some(parts.iter().map(|p| RespValue::bulk(p.as_bytes())).collect()))
    }

    #[test]
    fn test_ping() {
        let h = handler(10);
        assert_eq!(h.handle(cmd(&["PING"])), RespValue::SimpleString("PONG".to_string()));
        assert_eq!(h.handle(cmd(&["ping", "hi"])), RespValue::bulk("hi"));
    }

    #[test]
    fn test_echo() {
        let h = handler(10);
        assert_eq!(h.handle(cmd(&["ECHO", "hello"])), RespValue::bulk("hello"));
        assert!(matches!(h.handle(cmd(&["ECHO"])), RespValue::Error(_)));
    }

    #[test]
    fn test_set_and_get() {
        let h = handler(10);

        assert_eq!(h.handle(cmd(&["SET", "mykey", "myvalue"])), RespValue::ok());
        assert_eq!(h.handle(cmd(&["GET", "mykey"])), RespValue::bulk("myvalue"));
        assert_eq!(h.handle(cmd(&["GET", "other"])), RespValue::null());
    }

    #[test]
    fn test_eviction_through_commands() {
        let h = handler(2);

        h.handle(cmd(&["SET", "1", "a"]));
        h.handle(cmd(&["SET", "2", "b"]));
        h.handle(cmd(&["GET", "1"]));
        h.handle(cmd(&["SET", "3", "c"]));

        assert_eq!(h.handle(cmd(&["GET", "2"])), RespValue::null());
        assert_eq!(
            h.handle(cmd(&["KEYS", "*"])),
            RespValue::Array(Some(vec![RespValue::bulk("3"), RespValue::bulk("1")]))
        );
        assert_eq!(h.handle(cmd(&["DBSIZE"])), RespValue::Integer(2));
    }

    #[test]
    fn test_del_and_exists() {
        let h = handler(10);

        h.handle(cmd(&["SET", "a", "1"]));
        h.handle(cmd(&["SET", "b", "2"]));

        assert_eq!(h.handle(cmd(&["EXISTS", "a", "b", "c"])), RespValue::Integer(2));
        assert_eq!(h.handle(cmd(&["DEL", "a", "c"])), RespValue::Integer(1));
        assert_eq!(h.handle(cmd(&["EXISTS", "a"])), RespValue::Integer(0));
    }

    #[test]
    fn test_flushdb_and_info() {
        let h = handler(10);

        h.handle(cmd(&["SET", "a", "1"]));
        h.handle(cmd(&["GET", "a"]));
        assert_eq!(h.handle(cmd(&["FLUSHDB"])), RespValue::ok());
        assert_eq!(h.handle(cmd(&["DBSIZE"])), RespValue::Integer(0));

        let info = h.handle(cmd(&["INFO"]));
        let text = String::from_utf8(info.as_bytes().unwrap().to_vec()).unwrap();
        assert!(text.contains("keys:0\r\n"));
        assert!(text.contains("capacity:10\r\n"));
        assert!(text.contains("keyspace_hits:1\r\n"));
    }

    #[test]
    fn test_errors() {
        let h = handler(10);

        assert!(matches!(h.handle(cmd(&["NOPE"])), RespValue::Error(_)));
        assert!(matches!(h.handle(cmd(&["GET"])), RespValue::Error(_)));
        assert!(matches!(h.handle(cmd(&["SET", "k", "v", "EX", "10"])), RespValue::Error(_)));
        assert!(matches!(h.handle(cmd(&["KEYS", "a*"])), RespValue::Error(_)));
        assert!(matches!(h.handle(RespValue::Integer(1)), RespValue::Error(_)));
        assert!(matches!(
            h.handle(RespValue::Array(Some(vec![RespValue::bulk("GET"), RespValue::Integer(1)]))),
            RespValue::Error(_)
        ));
    }

    #[test]
    fn test_zero_capacity_server() {
        let h = handler(0);

        assert_eq!(h.handle(cmd(&["SET", "a", "1"])), RespValue::ok());
        assert_eq!(h.handle(cmd(&["GET", "a"])), RespValue::null());
    }
}
