#![no_main]

use {
  chainscribe::{partition::partition, Inscription},
  libfuzzer_sys::fuzz_target,
};

fuzz_target!(|input: (String, Vec<u8>)| {
  let (content_type, body) = input;

  let inscription = Inscription::new(content_type, body);
  let envelope = inscription.to_envelope(240);

  assert_eq!(Inscription::from_envelope(&envelope).unwrap(), inscription);

  if let Ok(partials) = partition(&envelope, 1500) {
    assert_eq!(partials.concat(), envelope);
  }
});
