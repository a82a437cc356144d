//! Printer stability over realistic sources: printing a parsed file and
//! re-parsing the output must print the same text again.

use phptobpc::parse_source;
use phptobpc::pretty::pretty_print;

fn assert_roundtrip_stable(source: &str) {
    let first = pretty_print(&parse_source(source).unwrap());
    let reparsed = parse_source(&first).unwrap_or_else(|e| panic!("printed output does not parse: {e}\n{first}"));
    let second = pretty_print(&reparsed);
    assert_eq!(first, second, "pretty-print is not idempotent");
}

#[test]
fn namespaced_library_file() {
    assert_roundtrip_stable(
        r#"<?php
declare(strict_types=1);

namespace App\Http;

use App\Contracts\{Handler, Middleware as MW};
use function App\Support\{tap, value};
use const App\VERSION;

abstract class Controller implements Handler
{
    use Concerns\Validates, Concerns\Responds;

    protected const STATUS = ['ok' => 200, 'missing' => 404];
    protected static ?self $instance = null;
    private array $middleware = [];

    private $mw;

    public function __construct(?MW $mw = null) { $this->mw = $mw; }

    abstract public function handle(Request $request): Response;

    final public static function instance(): static
    {
        return static::$instance ??= new static();
    }

    public function middleware(string ...$names): self
    {
        foreach ($names as $i => $name) {
            $this->middleware[$name] = $this->mw->resolve($name) ?? value($name);
        }
        return $this;
    }
}
"#,
    );
}

#[test]
fn procedural_script_with_html() {
    assert_roundtrip_stable(
        r#"<html>
<?php
$rows = require __DIR__ . '/rows.php';
$total = 0;
foreach ($rows as list('qty' => $qty, 'price' => $price)) {
    $total += $qty * $price;
}
?>
<table>
<?php foreach ($rows as $row) { ?>
  <tr><td><?php echo $row['name']; ?></td></tr>
<?php } ?>
</table>
<?php
printf("%0.2f\n", $total > 100 ? $total * .9 : $total);
"#,
    );
}

#[test]
fn expression_heavy_code() {
    assert_roundtrip_stable(
        r#"<?php
$a = -$b ** 2 + (-$c) ** 2;
$d = !$e instanceof F && ($g || $h) and $i;
$j = $k ? ($l ? 1 : 2) : ($m ?: 3);
$n = (clone $o)->p()[0]::$q;
$r = (function () { return 1; })() + (fn() => 2)();
$s = @file_get_contents('x') ?: "fallback {$t}";
$u = (int) $v . (string) (float) $w;
$x = $y = $z ?? [1, 2, ...$rest];
if (($line = fgets($fh)) !== false && !feof($fh)) { $count++; --$left; }
switch (true) { case $a > 1: case $a < -1: break; default: exit(1); }
"#,
    );
}

#[test]
fn converted_output_reparses() {
    let source = "<?php namespace A; const X = [1]; function f(?int $a = null): ?int { return $a ?? X[0]; } echo f();";
    let out = phptobpc::convert(source).unwrap();
    let program = parse_source(&out).unwrap();
    assert_eq!(pretty_print(&program), out);
}
