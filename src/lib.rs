/*!
A lightweight property observation and relay binding library

# Design requirements:
- One public entity, the [`Binding`]: an observation point over a subject and an accessor
- Subscribers registered via [`Binding::next`] fire once per observed change, in registration order, with the new value
- Two bindings connect via [`Binding::relate`]: a change on the source is pushed into the destination's accessor
- Self-links and mutual links must terminate in a bounded number of steps for one external change
- Teardown via [`Binding::complete`] is idempotent and safe to call mid-dispatch
- A binding never keeps its target alive; a dead target downgrades the binding to completed

# Basic usage

```rust
use tether::{Accessor, Binding, Subject};

struct Contact { name: String }

let contact = Subject::new(Contact { name: "Buffy".to_string() });
let binding = Binding::bind(&contact, Accessor::key_path("name", |c: &Contact| c.name.clone(), |c, v| c.name = v));

binding.next(|name: &String| println!("name is now {name}"));

contact.update(|c| c.name = "Willow".to_string());
// name is now Willow
```

# Relaying

Linking binding `a` to binding `b` pushes each of `a`'s new values onto `b`'s subject,
where `b`'s own subscribers observe it:

```rust
use tether::{Accessor, Binding, Subject};

struct Contact { name: String }
struct TextField { text: String }

let contact = Subject::new(Contact { name: String::new() });
let field = Subject::new(TextField { text: String::new() });

let a = Binding::bind(&contact, Accessor::key_path("name", |c: &Contact| c.name.clone(), |c, v| c.name = v));
let b = Binding::bind(&field, Accessor::key_path("text", |f: &TextField| f.text.clone(), |f, v| f.text = v));

a.relate(&b);
contact.update(|c| c.name = "Tom".to_string());
assert_eq!(field.with(|f| f.text.clone()), "Tom");
```
*/

mod accessor;
mod binding;
mod error;
mod subject;
mod subscription;

pub use accessor::*;
pub use binding::*;
pub use error::*;
pub use subject::*;
pub use subscription::{IntoSubscriber, SubscriberFn};
