fn main() {
  chainscribe::main()
}
